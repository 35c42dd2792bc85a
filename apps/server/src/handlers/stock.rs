//! Inventory ledger operations.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use creamline_core::{StockTransaction, StockTransactionType};
use creamline_db::repository::stock::StockLedgerFilter;
use creamline_db::Database;

use crate::error::{ApiError, ApiResult};

/// One inventory ledger operation, discriminated by `txType`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOperation {
    pub tx_type: StockTransactionType,
    pub product_id: String,
    /// Movement quantity; for manual adjustments, the absolute target level.
    pub quantity: i64,
    /// Required for vehicle load/unload.
    pub vehicle_id: Option<String>,
    pub staff_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub product_id: Option<String>,
    pub tx_type: Option<StockTransactionType>,
    pub vehicle_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// `POST /stock/transactions`
pub async fn apply(
    State(db): State<Database>,
    Json(op): Json<StockOperation>,
) -> ApiResult<(StatusCode, Json<StockTransaction>)> {
    let repo = db.stock();
    let notes = op.notes.as_deref();

    let record = match op.tx_type {
        StockTransactionType::AddStockInventory => {
            repo.add_stock(&op.product_id, op.quantity, &op.staff_id, notes)
                .await?
        }
        StockTransactionType::LoadToVehicle => {
            let vehicle_id = require_vehicle(op.vehicle_id.as_deref())?;
            repo.load_to_vehicle(&op.product_id, op.quantity, vehicle_id, &op.staff_id, notes)
                .await?
        }
        StockTransactionType::UnloadFromVehicle => {
            let vehicle_id = require_vehicle(op.vehicle_id.as_deref())?;
            repo.unload_from_vehicle(&op.product_id, op.quantity, vehicle_id, &op.staff_id, notes)
                .await?
        }
        StockTransactionType::RemoveStockWastage => {
            repo.remove_wastage(&op.product_id, op.quantity, &op.staff_id, notes)
                .await?
        }
        StockTransactionType::StockAdjustmentManual => {
            repo.adjust(&op.product_id, op.quantity, &op.staff_id, notes)
                .await?
        }
        StockTransactionType::IssueSample => {
            repo.issue_sample(&op.product_id, op.quantity, &op.staff_id, notes)
                .await?
        }
    };

    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /stock/transactions`
pub async fn list(
    State(db): State<Database>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Json<Vec<StockTransaction>>> {
    let filter = StockLedgerFilter {
        product_id: query.product_id,
        tx_type: query.tx_type,
        vehicle_id: query.vehicle_id,
    };
    let entries = db.stock().list(&filter, query.limit).await?;
    Ok(Json(entries))
}

fn require_vehicle(vehicle_id: Option<&str>) -> ApiResult<&str> {
    vehicle_id.ok_or_else(|| ApiError::bad_request("vehicleId is required for this operation"))
}
