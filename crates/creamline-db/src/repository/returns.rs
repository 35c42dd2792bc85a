//! # Return Repository
//!
//! Executes return/exchange settlements planned by the core engine.
//!
//! ## Settlement Transaction Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               One sqlx transaction, all or nothing                      │
//! │                                                                         │
//! │  1. Idempotency check (outside tx: replay returns the stored record)   │
//! │  2. Load sale ── SaleNotFound / AlreadyCancelled                       │
//! │  3. Load sale items ── sold quantities + applied prices per line       │
//! │  4. Load products ── snapshots, current stock                          │
//! │  5. creamline-core plan_settlement() ── arithmetic + stock plan        │
//! │  6. Apply stock effects ── restock / vehicle audit / wastage / debit   │
//! │  7. Reduce sale outstanding by settle_outstanding (invariant kept)     │
//! │  8. Insert return + returned_items + exchanged_items                   │
//! │  9. COMMIT                                                             │
//! │                                                                         │
//! │  Any business error (InsufficientStock, RefundSplitMismatch, ...)      │
//! │  rolls the whole scope back. Stock and money never drift apart.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use creamline_core::settlement::{
    build_payment_summary, plan_settlement, ExchangedLine, PaymentParts, ReturnedLine,
    SettlementOutcome, SettlementPayment, SettlementRequest,
};
use creamline_core::{
    CoreError, ExchangedItem, Money, ReturnTransaction, ReturnedItem, SaleType,
};

use crate::error::{DbError, DbResult};
use crate::repository::sale::{load_sale, load_sale_items, rebuild_summary};
use crate::repository::{apply_stock_effects, load_product, new_id};

const RETURN_COLUMNS: &str = "id, original_sale_id, customer_id, customer_name, return_date, \
     staff_id, return_total_cents, exchange_total_cents, settle_outstanding_cents, \
     refund_cents, cash_paid_out_cents, balance_due_cents, payment_amount_cents, \
     payment_summary, change_given_cents, payment_details, idempotency_key, created_at";

const RETURNED_ITEM_COLUMNS: &str = "id, return_id, product_id, name_snapshot, category, \
     sale_type, unit_price_cents, quantity, resellable";

const EXCHANGED_ITEM_COLUMNS: &str =
    "id, return_id, product_id, name_snapshot, category, unit_price_cents, quantity";

// =============================================================================
// Input / Output Types
// =============================================================================

fn default_resellable() -> bool {
    true
}

/// One returned line of a settlement request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReturnedItem {
    pub product_id: String,
    #[serde(default)]
    pub sale_type: SaleType,
    pub quantity: i64,
    #[serde(default = "default_resellable")]
    pub resellable: bool,
}

/// One exchanged line of a settlement request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExchangedItem {
    pub product_id: String,
    pub quantity: i64,
}

/// A settlement request as received from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSettlement {
    pub sale_id: String,
    pub staff_id: String,
    #[serde(default)]
    pub returned_items: Vec<NewReturnedItem>,
    #[serde(default)]
    pub exchanged_items: Vec<NewExchangedItem>,
    #[serde(default)]
    pub settle_outstanding_cents: i64,
    #[serde(default)]
    pub refund_cents: i64,
    #[serde(default)]
    pub cash_paid_out_cents: i64,
    pub payment: Option<SettlementPayment>,
    /// Optional dedup token; resubmission with the same key replays the
    /// stored record instead of settling twice.
    pub idempotency_key: Option<String>,
}

/// A stored settlement with its child records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub return_tx: ReturnTransaction,
    pub returned_items: Vec<ReturnedItem>,
    pub exchanged_items: Vec<ExchangedItem>,
    /// True when an idempotency-key resubmission returned the stored record.
    pub replayed: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository executing return/exchange settlements.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    /// Creates a new ReturnRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Executes a settlement.
    ///
    /// See the module docs for the transaction scope. Business failures
    /// surface as `DbError::Domain` and roll everything back.
    pub async fn settle(&self, input: NewSettlement) -> DbResult<SettlementRecord> {
        // Idempotent replay
        if let Some(key) = &input.idempotency_key {
            if let Some(existing) = self.get_by_idempotency_key(key).await? {
                info!(
                    return_id = %existing.return_tx.id,
                    idempotency_key = %key,
                    "Settlement replayed from idempotency key"
                );
                return Ok(SettlementRecord {
                    replayed: true,
                    ..existing
                });
            }
        }

        let now = Utc::now();
        let return_id = new_id();

        let mut tx = self.pool.begin().await?;

        let sale = load_sale(&mut tx, &input.sale_id).await?;
        if sale.is_cancelled() {
            return Err(DbError::Domain(CoreError::AlreadyCancelled(
                input.sale_id.clone(),
            )));
        }

        // Sold quantities and applied prices per (product, tier), from the
        // original sale lines. Returned items are priced at what the
        // customer actually paid, never at today's catalog price.
        let sale_items = load_sale_items(&mut tx, &input.sale_id).await?;
        let mut sold: HashMap<(String, SaleType), i64> = HashMap::new();
        let mut applied_price: HashMap<(String, SaleType), i64> = HashMap::new();
        for item in &sale_items {
            let key = (item.product_id.clone(), item.sale_type);
            *sold.entry(key.clone()).or_insert(0) += item.quantity;
            applied_price.insert(key, item.unit_price_cents);
        }

        // Resolve returned lines, keeping product snapshots for the record
        let mut returned_lines: Vec<ReturnedLine> = Vec::with_capacity(input.returned_items.len());
        let mut returned_records: Vec<ReturnedItem> =
            Vec::with_capacity(input.returned_items.len());
        for item in &input.returned_items {
            let product = load_product(&mut *tx, &item.product_id).await?;
            let unit_price = applied_price
                .get(&(item.product_id.clone(), item.sale_type))
                .copied()
                .unwrap_or(0);

            returned_lines.push(ReturnedLine {
                product_id: item.product_id.clone(),
                sale_type: item.sale_type,
                quantity: item.quantity,
                unit_price_cents: unit_price,
                resellable: item.resellable,
            });
            returned_records.push(ReturnedItem {
                id: new_id(),
                return_id: return_id.clone(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                category: product.category,
                sale_type: item.sale_type,
                unit_price_cents: unit_price,
                quantity: item.quantity,
                resellable: item.resellable,
            });
        }

        // Resolve exchanged lines at current catalog prices
        let mut exchanged_lines: Vec<ExchangedLine> =
            Vec::with_capacity(input.exchanged_items.len());
        let mut exchanged_records: Vec<ExchangedItem> =
            Vec::with_capacity(input.exchanged_items.len());
        for item in &input.exchanged_items {
            let product = load_product(&mut *tx, &item.product_id).await?;
            let unit_price = product.price().cents();

            exchanged_lines.push(ExchangedLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price_cents: unit_price,
            });
            exchanged_records.push(ExchangedItem {
                id: new_id(),
                return_id: return_id.clone(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                category: product.category,
                unit_price_cents: unit_price,
                quantity: item.quantity,
            });
        }

        let request = SettlementRequest {
            sale_id: input.sale_id.clone(),
            staff_id: input.staff_id.clone(),
            returned_items: returned_lines,
            exchanged_items: exchanged_lines,
            settle_outstanding: Money::from_cents(input.settle_outstanding_cents),
            refund: Money::from_cents(input.refund_cents),
            cash_paid_out: Money::from_cents(input.cash_paid_out_cents),
            payment: input.payment.clone(),
            vehicle_id: sale.vehicle_id.clone(),
        };

        let plan = plan_settlement(&request, &sold).map_err(DbError::Domain)?;
        let settlement = &plan.settlement;

        // Settling more than the sale actually owes would swallow credit
        if input.settle_outstanding_cents > sale.outstanding_cents {
            return Err(DbError::Domain(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "settleOutstanding {} exceeds sale outstanding {}",
                    input.settle_outstanding_cents, sale.outstanding_cents
                ),
            }));
        }

        apply_stock_effects(
            &mut tx,
            &plan.stock_effects,
            &input.staff_id,
            Some("Return settlement"),
            now,
        )
        .await?;

        // Pay down the sale with the settled portion of the return credit
        if input.settle_outstanding_cents > 0 {
            let total_paid = sale.total_paid_cents + input.settle_outstanding_cents;
            let outstanding = sale.outstanding_cents - input.settle_outstanding_cents;
            let summary = rebuild_summary(&sale, total_paid, outstanding);

            sqlx::query(
                r#"
                UPDATE sales SET
                    total_paid_cents = ?2,
                    outstanding_cents = ?3,
                    payment_summary = ?4,
                    updated_at = ?5
                WHERE id = ?1
                "#,
            )
            .bind(&sale.id)
            .bind(total_paid)
            .bind(outstanding)
            .bind(&summary)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let balance_due = match settlement.outcome {
            SettlementOutcome::BalanceDue(cents) => cents,
            _ => 0,
        };

        // Summary of the payment taken for any balance due
        let (payment_summary, payment_details) = match &input.payment {
            Some(payment) => {
                let parts = PaymentParts {
                    cash: payment.cash,
                    cheque: payment.cheque,
                    bank_transfer: payment.bank_transfer,
                    credit: Money::zero(),
                };
                let remaining =
                    Money::from_cents((balance_due - settlement.payment_amount.cents()).max(0));
                (
                    build_payment_summary(&parts, remaining),
                    payment.details.clone(),
                )
            }
            None => {
                let remaining = Money::from_cents(balance_due);
                (
                    build_payment_summary(&PaymentParts::default(), remaining),
                    None,
                )
            }
        };

        let record = ReturnTransaction {
            id: return_id.clone(),
            original_sale_id: sale.id.clone(),
            customer_id: sale.customer_id.clone(),
            customer_name: sale.customer_name.clone(),
            return_date: now,
            staff_id: input.staff_id.clone(),
            return_total_cents: settlement.return_total.cents(),
            exchange_total_cents: settlement.exchange_total.cents(),
            settle_outstanding_cents: input.settle_outstanding_cents,
            refund_cents: input.refund_cents,
            cash_paid_out_cents: input.cash_paid_out_cents,
            balance_due_cents: balance_due,
            payment_amount_cents: settlement.payment_amount.cents(),
            payment_summary,
            change_given_cents: settlement.change_given.cents(),
            payment_details,
            idempotency_key: input.idempotency_key.clone(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, original_sale_id, customer_id, customer_name, return_date, staff_id,
                return_total_cents, exchange_total_cents, settle_outstanding_cents,
                refund_cents, cash_paid_out_cents, balance_due_cents,
                payment_amount_cents, payment_summary, change_given_cents,
                payment_details, idempotency_key, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.original_sale_id)
        .bind(&record.customer_id)
        .bind(&record.customer_name)
        .bind(record.return_date)
        .bind(&record.staff_id)
        .bind(record.return_total_cents)
        .bind(record.exchange_total_cents)
        .bind(record.settle_outstanding_cents)
        .bind(record.refund_cents)
        .bind(record.cash_paid_out_cents)
        .bind(record.balance_due_cents)
        .bind(record.payment_amount_cents)
        .bind(&record.payment_summary)
        .bind(record.change_given_cents)
        .bind(&record.payment_details)
        .bind(&record.idempotency_key)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &returned_records {
            sqlx::query(
                r#"
                INSERT INTO returned_items (
                    id, return_id, product_id, name_snapshot, category,
                    sale_type, unit_price_cents, quantity, resellable
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.return_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.category)
            .bind(item.sale_type)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.resellable)
            .execute(&mut *tx)
            .await?;
        }

        for item in &exchanged_records {
            sqlx::query(
                r#"
                INSERT INTO exchanged_items (
                    id, return_id, product_id, name_snapshot, category,
                    unit_price_cents, quantity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.return_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.category)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            return_id = %record.id,
            sale_id = %record.original_sale_id,
            return_total_cents = record.return_total_cents,
            exchange_total_cents = record.exchange_total_cents,
            balance_due_cents = record.balance_due_cents,
            "Settlement completed"
        );

        Ok(SettlementRecord {
            return_tx: record,
            returned_items: returned_records,
            exchanged_items: exchanged_records,
            replayed: false,
        })
    }

    /// Gets a stored settlement with its items.
    pub async fn get_record(&self, return_id: &str) -> DbResult<Option<SettlementRecord>> {
        let sql = format!("SELECT {} FROM returns WHERE id = ?1", RETURN_COLUMNS);
        let Some(return_tx) = sqlx::query_as::<_, ReturnTransaction>(&sql)
            .bind(return_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        self.load_children(return_tx).await.map(Some)
    }

    /// Lists all returns, newest first.
    pub async fn history(&self, limit: u32) -> DbResult<Vec<ReturnTransaction>> {
        let sql = format!(
            "SELECT {} FROM returns ORDER BY return_date DESC LIMIT ?1",
            RETURN_COLUMNS
        );
        let returns = sqlx::query_as::<_, ReturnTransaction>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(returns)
    }

    async fn get_by_idempotency_key(&self, key: &str) -> DbResult<Option<SettlementRecord>> {
        let sql = format!("SELECT {} FROM returns WHERE idempotency_key = ?1", RETURN_COLUMNS);
        let Some(return_tx) = sqlx::query_as::<_, ReturnTransaction>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        self.load_children(return_tx).await.map(Some)
    }

    async fn load_children(&self, return_tx: ReturnTransaction) -> DbResult<SettlementRecord> {
        let returned_sql = format!(
            "SELECT {} FROM returned_items WHERE return_id = ?1",
            RETURNED_ITEM_COLUMNS
        );
        let returned_items = sqlx::query_as::<_, ReturnedItem>(&returned_sql)
            .bind(&return_tx.id)
            .fetch_all(&self.pool)
            .await?;

        let exchanged_sql = format!(
            "SELECT {} FROM exchanged_items WHERE return_id = ?1",
            EXCHANGED_ITEM_COLUMNS
        );
        let exchanged_items = sqlx::query_as::<_, ExchangedItem>(&exchanged_sql)
            .bind(&return_tx.id)
            .fetch_all(&self.pool)
            .await?;

        Ok(SettlementRecord {
            return_tx,
            returned_items,
            exchanged_items,
            replayed: false,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::NewCustomer;
    use crate::repository::product::NewProduct;
    use crate::repository::sale::{NewSale, NewSaleItem};
    use creamline_core::ProductCategory;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, sku: &str, price: i64, stock: i64) -> String {
        db.products()
            .create(
                NewProduct {
                    sku: sku.into(),
                    name: format!("{} product", sku),
                    category: ProductCategory::Yogurt,
                    price_cents: price,
                    wholesale_price_cents: None,
                    stock,
                    reorder_level: 0,
                },
                "staff-1",
            )
            .await
            .unwrap()
            .id
    }

    async fn seed_sale(
        db: &Database,
        product_id: &str,
        qty: i64,
        paid_cash: i64,
        customer_id: Option<String>,
    ) -> String {
        db.sales()
            .checkout(NewSale {
                customer_id,
                vehicle_id: None,
                staff_id: "staff-1".into(),
                items: vec![NewSaleItem {
                    product_id: product_id.into(),
                    sale_type: SaleType::Retail,
                    quantity: qty,
                }],
                discount_bps: 0,
                paid_cash_cents: paid_cash,
                paid_cheque_cents: 0,
                cheque_number: None,
                cheque_date: None,
                paid_bank_cents: 0,
                bank_reference: None,
                credit_used_cents: 0,
                sale_date: None,
            })
            .await
            .unwrap()
            .sale
            .id
    }

    fn base_settlement(sale_id: &str) -> NewSettlement {
        NewSettlement {
            sale_id: sale_id.into(),
            staff_id: "staff-1".into(),
            returned_items: vec![],
            exchanged_items: vec![],
            settle_outstanding_cents: 0,
            refund_cents: 0,
            cash_paid_out_cents: 0,
            payment: None,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_simple_return_restocks_and_pays_cash() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: product_id.clone(),
            sale_type: SaleType::Retail,
            quantity: 1,
            resellable: true,
        }];
        req.cash_paid_out_cents = 150;

        let record = db.returns().settle(req).await.unwrap();
        assert_eq!(record.return_tx.return_total_cents, 150);
        assert_eq!(record.return_tx.cash_paid_out_cents, 150);
        assert_eq!(record.return_tx.balance_due_cents, 0);
        assert!(!record.replayed);

        // 10 seeded, 2 sold, 1 returned
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 9);
    }

    #[tokio::test]
    async fn test_non_resellable_return_same_money_no_restock() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: product_id.clone(),
            sale_type: SaleType::Retail,
            quantity: 1,
            resellable: false,
        }];
        req.cash_paid_out_cents = 150;

        let record = db.returns().settle(req).await.unwrap();
        assert_eq!(record.return_tx.return_total_cents, 150);

        // Stock stays at 8; a wastage ledger row marks the loss
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 8);

        let wastage_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_transactions \
             WHERE product_id = ?1 AND tx_type = 'remove_stock_wastage' \
             AND previous_stock = new_stock",
        )
        .bind(&product_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(wastage_rows, 1);
    }

    #[tokio::test]
    async fn test_exchange_balance_due_and_stock_moves() {
        let db = test_db().await;
        let cheap = seed_product(&db, "YOG-500", 150, 10).await;
        let dear = seed_product(&db, "ICE-1L", 250, 5).await;
        let sale_id = seed_sale(&db, &cheap, 2, 300, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: cheap.clone(),
            sale_type: SaleType::Retail,
            quantity: 1,
            resellable: true,
        }];
        req.exchanged_items = vec![NewExchangedItem {
            product_id: dear.clone(),
            quantity: 1,
        }];
        req.payment = Some(SettlementPayment {
            cash: Money::from_cents(100),
            ..Default::default()
        });

        let record = db.returns().settle(req).await.unwrap();
        assert_eq!(record.return_tx.balance_due_cents, 100);
        assert_eq!(record.return_tx.payment_amount_cents, 100);
        assert_eq!(record.return_tx.change_given_cents, 0);
        assert_eq!(record.return_tx.payment_summary, "Cash");

        let cheap_after = db.products().get_by_id(&cheap).await.unwrap().unwrap();
        assert_eq!(cheap_after.stock, 9); // 10 - 2 sold + 1 returned
        let dear_after = db.products().get_by_id(&dear).await.unwrap().unwrap();
        assert_eq!(dear_after.stock, 4);
    }

    #[tokio::test]
    async fn test_exchange_insufficient_stock_rolls_everything_back() {
        let db = test_db().await;
        let cheap = seed_product(&db, "YOG-500", 150, 10).await;
        let dear = seed_product(&db, "ICE-1L", 250, 1).await;
        let sale_id = seed_sale(&db, &cheap, 2, 300, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: cheap.clone(),
            sale_type: SaleType::Retail,
            quantity: 2,
            resellable: true,
        }];
        req.exchanged_items = vec![NewExchangedItem {
            product_id: dear.clone(),
            quantity: 3,
        }];
        req.payment = Some(SettlementPayment {
            cash: Money::from_cents(450),
            ..Default::default()
        });

        let err = db.returns().settle(req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        // The restock of the returned items must have rolled back too
        let cheap_after = db.products().get_by_id(&cheap).await.unwrap().unwrap();
        assert_eq!(cheap_after.stock, 8);
        assert_eq!(db.returns().history(10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_empty_transaction_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await;

        let err = db.returns().settle(base_settlement(&sale_id)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyTransaction)));
    }

    #[tokio::test]
    async fn test_return_more_than_sold_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: product_id.clone(),
            sale_type: SaleType::Retail,
            quantity: 3,
            resellable: true,
        }];
        req.cash_paid_out_cents = 450;

        let err = db.returns().settle(req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ReturnExceedsSold { .. })
        ));
    }

    #[tokio::test]
    async fn test_settlement_on_cancelled_sale_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await;
        db.sales().cancel(&sale_id, "staff-1").await.unwrap();

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id,
            sale_type: SaleType::Retail,
            quantity: 1,
            resellable: true,
        }];
        req.cash_paid_out_cents = 150;

        let err = db.returns().settle(req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyCancelled(_))
        ));
    }

    #[tokio::test]
    async fn test_idempotency_key_replays_instead_of_double_settling() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: product_id.clone(),
            sale_type: SaleType::Retail,
            quantity: 1,
            resellable: true,
        }];
        req.cash_paid_out_cents = 150;
        req.idempotency_key = Some("retry-abc".into());

        let first = db.returns().settle(req.clone()).await.unwrap();
        let second = db.returns().settle(req).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.return_tx.id, second.return_tx.id);

        // Stock restored exactly once, single return row
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 9);
        assert_eq!(db.returns().history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settle_outstanding_pays_down_the_sale() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        // 2 x 1.50 = 3.00 total, 1.00 paid, 2.00 outstanding
        let sale_id = seed_sale(&db, &product_id, 2, 100, None).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: product_id.clone(),
            sale_type: SaleType::Retail,
            quantity: 2,
            resellable: true,
        }];
        req.settle_outstanding_cents = 200;
        req.cash_paid_out_cents = 100;

        let record = db.returns().settle(req).await.unwrap();
        assert_eq!(record.return_tx.settle_outstanding_cents, 200);

        let sale = db.sales().get_by_id(&sale_id).await.unwrap().unwrap();
        assert_eq!(sale.outstanding_cents, 0);
        assert_eq!(sale.total_paid_cents, 300);
        assert_eq!(
            sale.total_paid_cents + sale.outstanding_cents,
            sale.total_cents
        );
    }

    #[tokio::test]
    async fn test_settle_outstanding_beyond_sale_balance_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, None).await; // fully paid

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id,
            sale_type: SaleType::Retail,
            quantity: 2,
            resellable: true,
        }];
        req.settle_outstanding_cents = 200;
        req.cash_paid_out_cents = 100;

        let err = db.returns().settle(req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidPaymentAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_refund_as_credit_feeds_the_aggregator() {
        let db = test_db().await;
        let customer = db
            .customers()
            .create(NewCustomer {
                name: "Corner Shop".into(),
                phone: None,
                shop_name: None,
                address: None,
            })
            .await
            .unwrap();
        let product_id = seed_product(&db, "YOG-500", 150, 10).await;
        let sale_id = seed_sale(&db, &product_id, 2, 300, Some(customer.id.clone())).await;

        let mut req = base_settlement(&sale_id);
        req.returned_items = vec![NewReturnedItem {
            product_id: product_id.clone(),
            sale_type: SaleType::Retail,
            quantity: 1,
            resellable: true,
        }];
        req.refund_cents = 150; // whole refund goes to account credit

        db.returns().settle(req).await.unwrap();

        assert_eq!(
            db.customers().available_credit(&customer.id).await.unwrap(),
            150
        );

        // Spend the credit on a new sale
        db.sales()
            .checkout(NewSale {
                customer_id: Some(customer.id.clone()),
                vehicle_id: None,
                staff_id: "staff-1".into(),
                items: vec![NewSaleItem {
                    product_id,
                    sale_type: SaleType::Retail,
                    quantity: 1,
                }],
                discount_bps: 0,
                paid_cash_cents: 0,
                paid_cheque_cents: 0,
                cheque_number: None,
                cheque_date: None,
                paid_bank_cents: 0,
                bank_reference: None,
                credit_used_cents: 150,
                sale_date: None,
            })
            .await
            .unwrap();

        assert_eq!(
            db.customers().available_credit(&customer.id).await.unwrap(),
            0
        );
    }
}
