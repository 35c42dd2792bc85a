//! # Repository Implementations
//!
//! One repository per aggregate, each owning a clone of the pool:
//!
//! - [`product`] - Catalog CRUD and lookups
//! - [`sale`] - Checkout, additional payments, cancellation
//! - [`returns`] - Return/exchange settlement execution
//! - [`stock`] - Inventory ledger operations
//! - [`customer`] - Customers and the credit/outstanding aggregators
//! - [`vehicle`] - Distribution vehicles
//! - [`expense`] - Operating expenses
//! - [`report`] - Read-only reporting rollups
//! - [`user`] - Staff logins and the credential store
//!
//! This module also holds the shared transaction-scope helpers: loading
//! products mid-transaction and applying planned `StockEffect`s. Settlement,
//! cancellation and checkout all funnel their inventory writes through here
//! so the stock >= 0 invariant is enforced in exactly one place.

pub mod customer;
pub mod expense;
pub mod product;
pub mod report;
pub mod returns;
pub mod sale;
pub mod stock;
pub mod user;
pub mod vehicle;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use creamline_core::{CoreError, Product, StockEffect, StockTransactionType};

use crate::error::{DbError, DbResult};

/// Generates a new UUID v4 entity id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

const PRODUCT_COLUMNS: &str = "id, sku, name, category, price_cents, wholesale_price_cents, \
     stock, reorder_level, is_active, created_at, updated_at";

/// Loads a product inside a transaction, failing with the domain error when
/// it doesn't exist.
pub(crate) async fn load_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::Domain(CoreError::ProductNotFound(id.to_string())))
}

/// Sets a product's stock to an absolute value (computed by the caller from
/// a just-read row inside the same transaction).
pub(crate) async fn set_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    new_stock: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(new_stock)
        .bind(now)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Domain(CoreError::ProductNotFound(
            product_id.to_string(),
        )));
    }

    Ok(())
}

/// Appends a row to the stock ledger, returning the new row's id.
///
/// `previous_stock == new_stock` is legal: vehicle-side movements and
/// wastage on returns are audit-only.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_stock_audit(
    conn: &mut SqliteConnection,
    product: &Product,
    tx_type: StockTransactionType,
    quantity: i64,
    previous_stock: i64,
    new_stock: i64,
    vehicle_id: Option<&str>,
    staff_id: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<String> {
    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO stock_transactions (
            id, product_id, product_name, product_sku, tx_type,
            quantity, previous_stock, new_stock,
            transaction_date, notes, vehicle_id, staff_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&id)
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.sku)
    .bind(tx_type)
    .bind(quantity)
    .bind(previous_stock)
    .bind(new_stock)
    .bind(now)
    .bind(notes)
    .bind(vehicle_id)
    .bind(staff_id)
    .execute(conn)
    .await?;

    Ok(id)
}

/// Applies a planned list of stock effects inside the caller's transaction.
///
/// ## Effect Semantics
/// ```text
/// Restock      → main stock + qty (no ledger row; the return record is the audit)
/// VehicleLoad  → ledger row only, previous_stock == new_stock
/// WastageAudit → ledger row only, previous_stock == new_stock
/// Debit        → main stock - qty, guarded (InsufficientStock aborts scope)
/// ```
pub(crate) async fn apply_stock_effects(
    conn: &mut SqliteConnection,
    effects: &[StockEffect],
    staff_id: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    for effect in effects {
        match effect {
            StockEffect::Restock {
                product_id,
                quantity,
            } => {
                let product = load_product(&mut *conn, product_id).await?;
                set_stock(&mut *conn, product_id, product.stock + quantity, now).await?;
            }

            StockEffect::VehicleLoad {
                product_id,
                quantity,
                vehicle_id,
            } => {
                let product = load_product(&mut *conn, product_id).await?;
                insert_stock_audit(
                    &mut *conn,
                    &product,
                    StockTransactionType::LoadToVehicle,
                    *quantity,
                    product.stock,
                    product.stock,
                    Some(vehicle_id.as_str()),
                    staff_id,
                    notes,
                    now,
                )
                .await?;
            }

            StockEffect::WastageAudit {
                product_id,
                quantity,
            } => {
                let product = load_product(&mut *conn, product_id).await?;
                insert_stock_audit(
                    &mut *conn,
                    &product,
                    StockTransactionType::RemoveStockWastage,
                    *quantity,
                    product.stock,
                    product.stock,
                    None,
                    staff_id,
                    notes,
                    now,
                )
                .await?;
            }

            StockEffect::Debit {
                product_id,
                quantity,
            } => {
                let product = load_product(&mut *conn, product_id).await?;
                if !product.can_supply(*quantity) {
                    return Err(DbError::Domain(CoreError::InsufficientStock {
                        sku: product.sku,
                        available: product.stock,
                        requested: *quantity,
                    }));
                }
                set_stock(&mut *conn, product_id, product.stock - quantity, now).await?;
            }
        }
    }

    Ok(())
}
