//! # Stock Repository
//!
//! Manual inventory ledger operations: receiving stock, vehicle loading and
//! unloading, wastage, samples and corrections.
//!
//! ## Movement Semantics
//! ```text
//! add_stock           main + qty        ADD_STOCK_INVENTORY
//! load_to_vehicle     main - qty        LOAD_TO_VEHICLE      (guarded)
//! unload_from_vehicle main + qty        UNLOAD_FROM_VEHICLE
//! remove_wastage      main - qty        REMOVE_STOCK_WASTAGE (guarded)
//! issue_sample        main - qty        ISSUE_SAMPLE         (guarded)
//! adjust              main = target     STOCK_ADJUSTMENT_MANUAL
//! ```
//!
//! Every operation runs in its own transaction: read the product, guard,
//! write the new stock level, append the ledger row. The ledger row always
//! carries the before/after levels actually observed in that transaction.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use creamline_core::{CoreError, StockTransaction, StockTransactionType};

use crate::error::{DbError, DbResult};
use crate::repository::{insert_stock_audit, load_product, set_stock};

const COLUMNS: &str = "id, product_id, product_name, product_sku, tx_type, quantity, \
     previous_stock, new_stock, transaction_date, notes, vehicle_id, staff_id";

/// Filters for listing ledger entries. All optional, combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLedgerFilter {
    pub product_id: Option<String>,
    pub tx_type: Option<StockTransactionType>,
    pub vehicle_id: Option<String>,
}

/// Repository for inventory ledger operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Receives stock into main inventory.
    pub async fn add_stock(
        &self,
        product_id: &str,
        quantity: i64,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        self.move_stock(
            product_id,
            quantity,
            StockTransactionType::AddStockInventory,
            None,
            staff_id,
            notes,
        )
        .await
    }

    /// Moves stock from main inventory onto a vehicle's load.
    pub async fn load_to_vehicle(
        &self,
        product_id: &str,
        quantity: i64,
        vehicle_id: &str,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        self.move_stock(
            product_id,
            quantity,
            StockTransactionType::LoadToVehicle,
            Some(vehicle_id),
            staff_id,
            notes,
        )
        .await
    }

    /// Returns unsold load from a vehicle back to main inventory.
    pub async fn unload_from_vehicle(
        &self,
        product_id: &str,
        quantity: i64,
        vehicle_id: &str,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        self.move_stock(
            product_id,
            quantity,
            StockTransactionType::UnloadFromVehicle,
            Some(vehicle_id),
            staff_id,
            notes,
        )
        .await
    }

    /// Writes off damaged or expired stock.
    pub async fn remove_wastage(
        &self,
        product_id: &str,
        quantity: i64,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        self.move_stock(
            product_id,
            quantity,
            StockTransactionType::RemoveStockWastage,
            None,
            staff_id,
            notes,
        )
        .await
    }

    /// Issues free samples out of main inventory.
    pub async fn issue_sample(
        &self,
        product_id: &str,
        quantity: i64,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        self.move_stock(
            product_id,
            quantity,
            StockTransactionType::IssueSample,
            None,
            staff_id,
            notes,
        )
        .await
    }

    /// Corrects main stock to an absolute level after a physical count.
    ///
    /// The ledger row's quantity is the signed delta actually applied.
    pub async fn adjust(
        &self,
        product_id: &str,
        target_stock: i64,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        if target_stock < 0 {
            return Err(DbError::Domain(CoreError::InvalidRequest(
                "target stock must not be negative".into(),
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let product = load_product(&mut tx, product_id).await?;
        let delta = target_stock - product.stock;
        set_stock(&mut tx, product_id, target_stock, now).await?;

        let mut record = ledger_row(
            &product,
            StockTransactionType::StockAdjustmentManual,
            delta,
            product.stock,
            target_stock,
            None,
            staff_id,
            notes,
            now,
        );
        record.id = insert_stock_audit(
            &mut tx,
            &product,
            StockTransactionType::StockAdjustmentManual,
            delta,
            product.stock,
            target_stock,
            None,
            staff_id,
            notes,
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            delta = delta,
            new_stock = target_stock,
            "Manual stock adjustment"
        );
        Ok(record)
    }

    /// Lists ledger entries newest first, optionally filtered.
    pub async fn list(
        &self,
        filter: &StockLedgerFilter,
        limit: u32,
    ) -> DbResult<Vec<StockTransaction>> {
        let mut sql = format!(
            "SELECT {} FROM stock_transactions WHERE 1 = 1",
            COLUMNS
        );
        if filter.product_id.is_some() {
            sql.push_str(" AND product_id = ?1");
        }
        if filter.tx_type.is_some() {
            sql.push_str(" AND tx_type = ?2");
        }
        if filter.vehicle_id.is_some() {
            sql.push_str(" AND vehicle_id = ?3");
        }
        sql.push_str(" ORDER BY transaction_date DESC LIMIT ?4");

        let rows = sqlx::query_as::<_, StockTransaction>(&sql)
            .bind(filter.product_id.as_deref())
            .bind(filter.tx_type)
            .bind(filter.vehicle_id.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // Shared scope for the fixed-direction movements
    async fn move_stock(
        &self,
        product_id: &str,
        quantity: i64,
        tx_type: StockTransactionType,
        vehicle_id: Option<&str>,
        staff_id: &str,
        notes: Option<&str>,
    ) -> DbResult<StockTransaction> {
        if quantity <= 0 {
            return Err(DbError::Domain(CoreError::InvalidRequest(
                "quantity must be positive".into(),
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let product = load_product(&mut tx, product_id).await?;
        let new_stock = match tx_type {
            StockTransactionType::AddStockInventory
            | StockTransactionType::UnloadFromVehicle => product.stock + quantity,
            StockTransactionType::LoadToVehicle
            | StockTransactionType::RemoveStockWastage
            | StockTransactionType::IssueSample => {
                if !product.can_supply(quantity) {
                    return Err(DbError::Domain(CoreError::InsufficientStock {
                        sku: product.sku,
                        available: product.stock,
                        requested: quantity,
                    }));
                }
                product.stock - quantity
            }
            StockTransactionType::StockAdjustmentManual => {
                // adjust() owns this type; it never reaches move_stock
                return Err(DbError::Domain(CoreError::InvalidRequest(
                    "manual adjustments use the adjust operation".into(),
                )));
            }
        };

        set_stock(&mut tx, product_id, new_stock, now).await?;

        let mut record = ledger_row(
            &product,
            tx_type,
            quantity,
            product.stock,
            new_stock,
            vehicle_id,
            staff_id,
            notes,
            now,
        );
        record.id = insert_stock_audit(
            &mut tx,
            &product,
            tx_type,
            quantity,
            product.stock,
            new_stock,
            vehicle_id,
            staff_id,
            notes,
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            tx_type = ?tx_type,
            quantity = quantity,
            new_stock = new_stock,
            "Stock movement recorded"
        );
        Ok(record)
    }
}

#[allow(clippy::too_many_arguments)]
fn ledger_row(
    product: &creamline_core::Product,
    tx_type: StockTransactionType,
    quantity: i64,
    previous_stock: i64,
    new_stock: i64,
    vehicle_id: Option<&str>,
    staff_id: &str,
    notes: Option<&str>,
    now: chrono::DateTime<Utc>,
) -> StockTransaction {
    StockTransaction {
        id: String::new(),
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        product_sku: product.sku.clone(),
        tx_type,
        quantity,
        previous_stock,
        new_stock,
        transaction_date: now,
        notes: notes.map(String::from),
        vehicle_id: vehicle_id.map(String::from),
        staff_id: staff_id.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
