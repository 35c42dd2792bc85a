//! Return/exchange settlements.

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use creamline_core::ReturnTransaction;
use creamline_db::repository::returns::{NewSettlement, SettlementRecord};
use creamline_db::Database;

use crate::error::ApiResult;
use crate::handlers::sales::ListQuery;

/// Response body for `POST /returns`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub message: String,
    pub return_id: String,
    pub return_data: SettlementRecord,
}

/// `POST /returns` — execute a settlement.
///
/// Replays (same idempotency key) answer 200 with the stored record, so a
/// retried request is indistinguishable from the first on the client side.
pub async fn settle(
    State(db): State<Database>,
    Json(input): Json<NewSettlement>,
) -> ApiResult<Json<SettleResponse>> {
    let record = db.returns().settle(input).await?;

    info!(
        return_id = %record.return_tx.id,
        replayed = record.replayed,
        "Settlement request handled"
    );

    Ok(Json(SettleResponse {
        message: if record.replayed {
            "Return already processed".to_string()
        } else {
            "Return processed successfully".to_string()
        },
        return_id: record.return_tx.id.clone(),
        return_data: record,
    }))
}

/// `GET /returns/history`
pub async fn history(
    State(db): State<Database>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ReturnTransaction>>> {
    let returns = db.returns().history(query.limit).await?;
    Ok(Json(returns))
}
