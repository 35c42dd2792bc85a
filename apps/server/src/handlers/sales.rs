//! Sales: checkout, lookup, additional payments, cancellation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use creamline_core::Sale;
use creamline_db::repository::sale::{NewPayment, NewSale, SaleDetails};
use creamline_db::Database;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// `POST /sales`
pub async fn checkout(
    State(db): State<Database>,
    Json(input): Json<NewSale>,
) -> ApiResult<(StatusCode, Json<SaleDetails>)> {
    let details = db.sales().checkout(input).await?;
    info!(sale_id = %details.sale.id, total_cents = details.sale.total_cents, "Sale completed");
    Ok((StatusCode::CREATED, Json(details)))
}

/// `GET /sales`
pub async fn list(
    State(db): State<Database>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let sales = db.sales().list_recent(query.limit).await?;
    Ok(Json(sales))
}

/// `GET /sales/{id}`
pub async fn get(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetails>> {
    let details = db
        .sales()
        .get_details(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Sale not found: {}", id)))?;
    Ok(Json(details))
}

/// `PATCH /sales/{id}` — record an additional payment.
pub async fn add_payment(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(input): Json<NewPayment>,
) -> ApiResult<Json<Sale>> {
    let sale = db.sales().add_payment(&id, input).await?;
    Ok(Json(sale))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQuery {
    pub staff_id: String,
}

/// `DELETE /sales/{id}` — cancel, reversing inventory.
pub async fn cancel(
    State(db): State<Database>,
    Path(id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> ApiResult<Json<Sale>> {
    let sale = db.sales().cancel(&id, &query.staff_id).await?;
    info!(sale_id = %id, "Sale cancelled");
    Ok(Json(sale))
}
