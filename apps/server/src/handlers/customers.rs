//! Customers and the derived credit/outstanding balances.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use creamline_core::Customer;
use creamline_db::repository::customer::NewCustomer;
use creamline_db::Database;

use crate::error::ApiResult;
use crate::handlers::sales::ListQuery;

/// `POST /customers`
pub async fn create(
    State(db): State<Database>,
    Json(input): Json<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = db.customers().create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `GET /customers`
pub async fn list(
    State(db): State<Database>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    let customers = db.customers().list(query.limit).await?;
    Ok(Json(customers))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditQuery {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditResponse {
    pub customer_id: String,
    pub available_credit_cents: i64,
    pub outstanding_cents: i64,
}

/// `GET /customers/credit?id=` — derived balances for one customer.
pub async fn credit(
    State(db): State<Database>,
    Query(query): Query<CreditQuery>,
) -> ApiResult<Json<CreditResponse>> {
    let available_credit_cents = db.customers().available_credit(&query.id).await?;
    let outstanding_cents = db.customers().outstanding_balance(&query.id).await?;

    Ok(Json(CreditResponse {
        customer_id: query.id,
        available_credit_cents,
        outstanding_cents,
    }))
}
