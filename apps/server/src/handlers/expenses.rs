//! Operating expenses.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use creamline_core::Expense;
use creamline_db::repository::expense::NewExpense;
use creamline_db::Database;

use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// `POST /expenses`
pub async fn record(
    State(db): State<Database>,
    Json(input): Json<NewExpense>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let expense = db.expenses().record(input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `GET /expenses?from=&to=`
pub async fn list(
    State(db): State<Database>,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<Json<Vec<Expense>>> {
    let expenses = db
        .expenses()
        .list_between(query.from, query.to, query.limit)
        .await?;
    Ok(Json(expenses))
}
