//! # Sale Repository
//!
//! Database operations for sales, their line items and follow-up payments.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction)                                         │
//! │     └── checkout() → prices resolved, stock debited (guarded),         │
//! │         payment split recorded, outstanding derived                    │
//! │                                                                         │
//! │  2. (OPTIONAL) ADDITIONAL PAYMENTS                                     │
//! │     └── add_payment() → appends a payment row, recomputes              │
//! │         total_paid / outstanding / payment_summary                     │
//! │                                                                         │
//! │  3. (OPTIONAL) SETTLEMENT                                              │
//! │     └── returns repository: settle_outstanding reduces what's owed     │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL                                                  │
//! │     └── cancel() → stock reversed (vehicle-aware), status Cancelled,   │
//! │         outstanding zeroed. Sales are never deleted.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sale header keeps the invariant
//! `total_paid_cents + outstanding_cents == total_cents` through every
//! mutation; integer cents make the equality exact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use creamline_core::settlement::{build_payment_summary, plan_cancellation, PaymentParts};
use creamline_core::validation::{
    validate_discount_bps, validate_payment_amount, validate_quantity, validate_sale_size,
};
use creamline_core::{
    AdditionalPayment, CoreError, Money, PaymentMethod, Sale, SaleItem, SaleStatus, SaleType,
};

use crate::error::{DbError, DbResult};
use crate::repository::customer::available_credit_on;
use crate::repository::{apply_stock_effects, load_product, new_id};

const SALE_COLUMNS: &str = "id, customer_id, customer_name, status, \
     subtotal_cents, discount_bps, discount_cents, total_cents, \
     paid_cash_cents, paid_cheque_cents, cheque_number, cheque_date, \
     paid_bank_cents, bank_reference, credit_used_cents, \
     total_paid_cents, outstanding_cents, payment_summary, \
     vehicle_id, sale_date, staff_id, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, sku_snapshot, name_snapshot, \
     sale_type, unit_price_cents, quantity, line_total_cents, created_at";

const PAYMENT_COLUMNS: &str =
    "id, sale_id, method, amount_cents, details, notes, payment_date, staff_id, created_at";

// =============================================================================
// Input / Output Types
// =============================================================================

/// One line of a checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub product_id: String,
    #[serde(default)]
    pub sale_type: SaleType,
    pub quantity: i64,
}

/// A checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub customer_id: Option<String>,
    /// Set when the stock leaves a vehicle's load instead of main inventory.
    pub vehicle_id: Option<String>,
    pub staff_id: String,
    pub items: Vec<NewSaleItem>,
    #[serde(default)]
    pub discount_bps: u32,

    #[serde(default)]
    pub paid_cash_cents: i64,
    #[serde(default)]
    pub paid_cheque_cents: i64,
    pub cheque_number: Option<String>,
    pub cheque_date: Option<String>,
    #[serde(default)]
    pub paid_bank_cents: i64,
    pub bank_reference: Option<String>,
    /// Paid from the customer's accumulated return credit.
    #[serde(default)]
    pub credit_used_cents: i64,

    pub sale_date: Option<DateTime<Utc>>,
}

/// A follow-up payment against an existing sale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub details: Option<String>,
    pub notes: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub staff_id: String,
}

/// A sale with its child records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub additional_payments: Vec<AdditionalPayment>,
}

// =============================================================================
// Payment Summary
// =============================================================================

/// Rebuilds the payment summary from the sale's cumulative component fields.
///
/// The credit component is derived as the remainder so settle-outstanding
/// contributions from returns show up without a dedicated column.
fn summary_for(
    total_paid: i64,
    cash: i64,
    cheque: i64,
    bank: i64,
    outstanding: i64,
) -> String {
    let parts = PaymentParts {
        cash: Money::from_cents(cash),
        cheque: Money::from_cents(cheque),
        bank_transfer: Money::from_cents(bank),
        credit: Money::from_cents(total_paid - cash - cheque - bank),
    };
    build_payment_summary(&parts, Money::from_cents(outstanding))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Executes a checkout in one transaction.
    ///
    /// ## What Happens
    /// 1. Items validated, products resolved, tier prices applied
    /// 2. Subtotal / discount / total computed in integer cents
    /// 3. Non-vehicle sales debit main stock per line (guarded); vehicle
    ///    sales leave main stock untouched
    /// 4. Payment split recorded; overpayment rejected; outstanding derived
    pub async fn checkout(&self, input: NewSale) -> DbResult<SaleDetails> {
        validate_sale_size(input.items.len()).map_err(CoreError::from)?;
        validate_discount_bps(input.discount_bps).map_err(CoreError::from)?;
        for item in &input.items {
            validate_quantity(item.quantity).map_err(CoreError::from)?;
        }
        if input.staff_id.trim().is_empty() {
            return Err(DbError::Domain(CoreError::InvalidRequest(
                "staffId is required".into(),
            )));
        }
        if input.paid_cash_cents < 0
            || input.paid_cheque_cents < 0
            || input.paid_bank_cents < 0
            || input.credit_used_cents < 0
        {
            return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                reason: "payment components must not be negative".into(),
            }));
        }
        if input.credit_used_cents > 0 && input.customer_id.is_none() {
            return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                reason: "credit payment requires a customer".into(),
            }));
        }

        let now = Utc::now();
        let sale_date = input.sale_date.unwrap_or(now);
        let sale_id = new_id();

        let mut tx = self.pool.begin().await?;

        // Resolve customer
        let customer_name = match &input.customer_id {
            Some(customer_id) => {
                let name: Option<String> =
                    sqlx::query_scalar("SELECT name FROM customers WHERE id = ?1")
                        .bind(customer_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                match name {
                    Some(name) => Some(name),
                    None => {
                        return Err(DbError::Domain(CoreError::CustomerNotFound(
                            customer_id.clone(),
                        )))
                    }
                }
            }
            None => None,
        };

        // Resolve vehicle
        if let Some(vehicle_id) = &input.vehicle_id {
            let exists: Option<String> = sqlx::query_scalar("SELECT id FROM vehicles WHERE id = ?1")
                .bind(vehicle_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(DbError::Domain(CoreError::VehicleNotFound(
                    vehicle_id.clone(),
                )));
            }
        }

        // Credit payments draw on the customer's accumulated return credit
        if input.credit_used_cents > 0 {
            if let Some(customer_id) = &input.customer_id {
                let available = available_credit_on(&mut tx, customer_id).await?;
                if input.credit_used_cents > available {
                    return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                        reason: format!(
                            "credit payment {} exceeds available credit {}",
                            input.credit_used_cents, available
                        ),
                    }));
                }
            }
        }

        // Resolve lines and build items
        let mut items: Vec<SaleItem> = Vec::with_capacity(input.items.len());
        let mut subtotal = Money::zero();
        for line in &input.items {
            let product = load_product(&mut *tx, &line.product_id).await?;
            if !product.is_active {
                return Err(DbError::Domain(CoreError::InvalidRequest(format!(
                    "product {} is inactive",
                    product.sku
                ))));
            }

            // Non-vehicle sales pull from main inventory
            if input.vehicle_id.is_none() {
                if !product.can_supply(line.quantity) {
                    return Err(DbError::Domain(CoreError::InsufficientStock {
                        sku: product.sku,
                        available: product.stock,
                        requested: line.quantity,
                    }));
                }
                crate::repository::set_stock(
                    &mut *tx,
                    &product.id,
                    product.stock - line.quantity,
                    now,
                )
                .await?;
            }

            let unit_price = product.price_for(line.sale_type);
            let line_total = unit_price * line.quantity;
            subtotal += line_total;

            items.push(SaleItem {
                id: new_id(),
                sale_id: sale_id.clone(),
                product_id: product.id.clone(),
                sku_snapshot: product.sku.clone(),
                name_snapshot: product.name.clone(),
                sale_type: line.sale_type,
                unit_price_cents: unit_price.cents(),
                quantity: line.quantity,
                line_total_cents: line_total.cents(),
                created_at: now,
            });
        }

        let discount = subtotal.percentage_bps(input.discount_bps);
        let total = subtotal - discount;

        let total_paid = input.paid_cash_cents
            + input.paid_cheque_cents
            + input.paid_bank_cents
            + input.credit_used_cents;
        if total_paid > total.cents() {
            return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "payment {} exceeds sale total {}",
                    total_paid,
                    total.cents()
                ),
            }));
        }
        let outstanding = total.cents() - total_paid;

        let payment_summary = summary_for(
            total_paid,
            input.paid_cash_cents,
            input.paid_cheque_cents,
            input.paid_bank_cents,
            outstanding,
        );

        let sale = Sale {
            id: sale_id.clone(),
            customer_id: input.customer_id.clone(),
            customer_name,
            status: SaleStatus::Active,
            subtotal_cents: subtotal.cents(),
            discount_bps: input.discount_bps,
            discount_cents: discount.cents(),
            total_cents: total.cents(),
            paid_cash_cents: input.paid_cash_cents,
            paid_cheque_cents: input.paid_cheque_cents,
            cheque_number: input.cheque_number.clone(),
            cheque_date: input.cheque_date.clone(),
            paid_bank_cents: input.paid_bank_cents,
            bank_reference: input.bank_reference.clone(),
            credit_used_cents: input.credit_used_cents,
            total_paid_cents: total_paid,
            outstanding_cents: outstanding,
            payment_summary,
            vehicle_id: input.vehicle_id.clone(),
            sale_date,
            staff_id: input.staff_id.clone(),
            created_at: now,
            updated_at: now,
        };

        insert_sale(&mut tx, &sale).await?;
        for item in &items {
            insert_sale_item(&mut tx, item).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            total_cents = sale.total_cents,
            outstanding_cents = sale.outstanding_cents,
            "Sale completed"
        );

        Ok(SaleDetails {
            sale,
            items,
            additional_payments: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale with its items and additional payments.
    pub async fn get_details(&self, id: &str) -> DbResult<Option<SaleDetails>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let items_sql = format!(
            "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, SaleItem>(&items_sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        let payments_sql = format!(
            "SELECT {} FROM additional_payments WHERE sale_id = ?1 ORDER BY payment_date",
            PAYMENT_COLUMNS
        );
        let additional_payments = sqlx::query_as::<_, AdditionalPayment>(&payments_sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(SaleDetails {
            sale,
            items,
            additional_payments,
        }))
    }

    /// Lists recent sales, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales ORDER BY sale_date DESC LIMIT ?1",
            SALE_COLUMNS
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    // -------------------------------------------------------------------------
    // Additional Payments
    // -------------------------------------------------------------------------

    /// Records a follow-up payment and recomputes the sale's paid totals.
    ///
    /// ## Rules
    /// - Rejected on cancelled sales
    /// - Amount must be positive and not exceed the outstanding balance
    /// - Credit payments draw on the customer's available return credit
    pub async fn add_payment(&self, sale_id: &str, input: NewPayment) -> DbResult<Sale> {
        validate_payment_amount(input.amount_cents).map_err(CoreError::from)?;

        let now = Utc::now();
        let payment_date = input.payment_date.unwrap_or(now);

        let mut tx = self.pool.begin().await?;

        let sale = load_sale(&mut tx, sale_id).await?;
        if sale.is_cancelled() {
            return Err(DbError::Domain(CoreError::AlreadyCancelled(
                sale_id.to_string(),
            )));
        }
        if input.amount_cents > sale.outstanding_cents {
            return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "payment {} exceeds outstanding balance {}",
                    input.amount_cents, sale.outstanding_cents
                ),
            }));
        }

        if input.method == PaymentMethod::Credit {
            let Some(customer_id) = &sale.customer_id else {
                return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                    reason: "credit payment requires a customer".into(),
                }));
            };
            let available = available_credit_on(&mut tx, customer_id).await?;
            if input.amount_cents > available {
                return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                    reason: format!(
                        "credit payment {} exceeds available credit {}",
                        input.amount_cents, available
                    ),
                }));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO additional_payments (
                id, sale_id, method, amount_cents, details, notes,
                payment_date, staff_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(new_id())
        .bind(sale_id)
        .bind(input.method)
        .bind(input.amount_cents)
        .bind(&input.details)
        .bind(&input.notes)
        .bind(payment_date)
        .bind(&input.staff_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Fold the payment into the cumulative component columns
        let (cash, cheque, bank, credit) = match input.method {
            PaymentMethod::Cash => (input.amount_cents, 0, 0, 0),
            PaymentMethod::Cheque => (0, input.amount_cents, 0, 0),
            PaymentMethod::BankTransfer => (0, 0, input.amount_cents, 0),
            PaymentMethod::Credit => (0, 0, 0, input.amount_cents),
        };

        let total_paid = sale.total_paid_cents + input.amount_cents;
        let outstanding = sale.outstanding_cents - input.amount_cents;
        let payment_summary = summary_for(
            total_paid,
            sale.paid_cash_cents + cash,
            sale.paid_cheque_cents + cheque,
            sale.paid_bank_cents + bank,
            outstanding,
        );

        sqlx::query(
            r#"
            UPDATE sales SET
                paid_cash_cents = paid_cash_cents + ?2,
                paid_cheque_cents = paid_cheque_cents + ?3,
                paid_bank_cents = paid_bank_cents + ?4,
                credit_used_cents = credit_used_cents + ?5,
                total_paid_cents = ?6,
                outstanding_cents = ?7,
                payment_summary = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(cash)
        .bind(cheque)
        .bind(bank)
        .bind(credit)
        .bind(total_paid)
        .bind(outstanding)
        .bind(&payment_summary)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let updated = load_sale(&mut tx, sale_id).await?;
        tx.commit().await?;

        debug!(
            sale_id = %sale_id,
            amount_cents = input.amount_cents,
            outstanding_cents = updated.outstanding_cents,
            "Payment recorded"
        );

        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Cancellation
    // -------------------------------------------------------------------------

    /// Cancels a sale, reversing its inventory effect.
    ///
    /// Vehicle-sourced sales write LoadToVehicle ledger rows (main stock was
    /// never debited); others restock main inventory. Outstanding is zeroed.
    /// Cancelling twice fails with `AlreadyCancelled`.
    pub async fn cancel(&self, sale_id: &str, staff_id: &str) -> DbResult<Sale> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let sale = load_sale(&mut tx, sale_id).await?;
        if sale.is_cancelled() {
            return Err(DbError::Domain(CoreError::AlreadyCancelled(
                sale_id.to_string(),
            )));
        }

        let lines: Vec<(String, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM sale_items WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_all(&mut *tx)
                .await?;

        let plan = plan_cancellation(
            sale.vehicle_id.as_deref(),
            lines.iter().map(|(id, qty)| (id.as_str(), *qty)),
        );
        apply_stock_effects(
            &mut tx,
            &plan.stock_effects,
            staff_id,
            Some("Sale cancellation"),
            now,
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE sales SET
                status = ?2,
                outstanding_cents = 0,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(SaleStatus::Cancelled)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let updated = load_sale(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, "Sale cancelled");

        Ok(updated)
    }
}

// =============================================================================
// Transaction-Scope Helpers (shared with the return repository)
// =============================================================================

pub(crate) async fn load_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
    sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::Domain(CoreError::SaleNotFound(id.to_string())))
}

pub(crate) async fn load_sale_items(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let sql = format!(
        "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at",
        ITEM_COLUMNS
    );
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Rebuilds the payment summary after a settlement touches the sale.
pub(crate) fn rebuild_summary(sale: &Sale, total_paid: i64, outstanding: i64) -> String {
    summary_for(
        total_paid,
        sale.paid_cash_cents,
        sale.paid_cheque_cents,
        sale.paid_bank_cents,
        outstanding,
    )
}

async fn insert_sale(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, customer_id, customer_name, status,
            subtotal_cents, discount_bps, discount_cents, total_cents,
            paid_cash_cents, paid_cheque_cents, cheque_number, cheque_date,
            paid_bank_cents, bank_reference, credit_used_cents,
            total_paid_cents, outstanding_cents, payment_summary,
            vehicle_id, sale_date, staff_id, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(sale.status)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_bps)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.paid_cash_cents)
    .bind(sale.paid_cheque_cents)
    .bind(&sale.cheque_number)
    .bind(&sale.cheque_date)
    .bind(sale.paid_bank_cents)
    .bind(&sale.bank_reference)
    .bind(sale.credit_used_cents)
    .bind(sale.total_paid_cents)
    .bind(sale.outstanding_cents)
    .bind(&sale.payment_summary)
    .bind(&sale.vehicle_id)
    .bind(sale.sale_date)
    .bind(&sale.staff_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_sale_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &SaleItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, sku_snapshot, name_snapshot,
            sale_type, unit_price_cents, quantity, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.sku_snapshot)
    .bind(&item.name_snapshot)
    .bind(item.sale_type)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
