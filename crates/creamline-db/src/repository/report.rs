//! # Report Repository
//!
//! Read-only rollups over the transaction tables. Nothing here writes;
//! every figure is recomputed from sales, payments, returns and expenses on
//! each request, so reports can never disagree with the underlying records.
//!
//! ## Net Cash Position
//! ```text
//! cash collected   = Σ sales.paid_cash (at checkout, in range)
//!                  + Σ additional_payments.amount where method = cash
//!                  + Σ returns.payment cash component (balance-due payments)
//! net cash         = cash collected − Σ returns.cash_paid_out − Σ expenses
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use creamline_core::ProductCategory;

use crate::error::DbResult;

// =============================================================================
// Report Types
// =============================================================================

/// Rollup of a single trading day or an arbitrary range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub sales_count: i64,
    /// Sum of subtotals before discount.
    pub gross_cents: i64,
    pub discount_cents: i64,
    /// Sum of sale totals after discount.
    pub net_cents: i64,
    pub cash_cents: i64,
    pub cheque_cents: i64,
    pub bank_transfer_cents: i64,
    pub credit_used_cents: i64,
    /// Outstanding balance added by sales in the range.
    pub outstanding_added_cents: i64,
}

/// Day-end cash position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEndReport {
    pub date: NaiveDate,
    pub sales: SalesSummary,
    pub returns_count: i64,
    pub refunds_cents: i64,
    pub cash_paid_out_cents: i64,
    pub expenses_cents: i64,
    /// Cash in minus cash out for the day.
    pub net_cash_cents: i64,
}

/// Net revenue for one product category over a range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: ProductCategory,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Range rollup with per-category breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub sales: SalesSummary,
    pub returns_count: i64,
    pub refunds_cents: i64,
    pub cash_paid_out_cents: i64,
    pub expenses_cents: i64,
    pub net_cash_cents: i64,
    pub categories: Vec<CategoryTotal>,
}

/// Per-vehicle activity rollup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReport {
    pub vehicle_id: String,
    pub loaded_quantity: i64,
    pub unloaded_quantity: i64,
    pub sales_count: i64,
    pub sales_total_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for read-only reporting rollups.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the day-end report for a calendar date (UTC).
    pub async fn day_end(&self, date: NaiveDate) -> DbResult<DayEndReport> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let end = start + Duration::days(1);

        let sales = self.sales_summary(start, end).await?;
        let (returns_count, refunds, cash_paid_out, returns_cash_in) =
            self.returns_summary(start, end).await?;
        let expenses = self.expenses_total(start, end).await?;

        let cash_in = sales.cash_cents + self.additional_cash(start, end).await? + returns_cash_in;
        let net_cash = cash_in - cash_paid_out - expenses;

        Ok(DayEndReport {
            date,
            sales,
            returns_count,
            refunds_cents: refunds,
            cash_paid_out_cents: cash_paid_out,
            expenses_cents: expenses,
            net_cash_cents: net_cash,
        })
    }

    /// Builds the range report with per-category totals.
    pub async fn full(&self, from: NaiveDate, to: NaiveDate) -> DbResult<FullReport> {
        let start = from
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        // `to` is inclusive
        let end = to
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
            + Duration::days(1);

        let sales = self.sales_summary(start, end).await?;
        let (returns_count, refunds, cash_paid_out, returns_cash_in) =
            self.returns_summary(start, end).await?;
        let expenses = self.expenses_total(start, end).await?;
        let categories = self.category_totals(start, end).await?;

        let cash_in = sales.cash_cents + self.additional_cash(start, end).await? + returns_cash_in;
        let net_cash = cash_in - cash_paid_out - expenses;

        Ok(FullReport {
            from,
            to,
            sales,
            returns_count,
            refunds_cents: refunds,
            cash_paid_out_cents: cash_paid_out,
            expenses_cents: expenses,
            net_cash_cents: net_cash,
            categories,
        })
    }

    /// Builds the per-vehicle activity rollup over all time.
    pub async fn vehicle(&self, vehicle_id: &str) -> DbResult<VehicleReport> {
        let loaded: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_transactions \
             WHERE vehicle_id = ?1 AND tx_type = 'load_to_vehicle'",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;

        let unloaded: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_transactions \
             WHERE vehicle_id = ?1 AND tx_type = 'unload_from_vehicle'",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;

        let (sales_count, sales_total): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_cents), 0) FROM sales \
             WHERE vehicle_id = ?1 AND status = 'active'",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(VehicleReport {
            vehicle_id: vehicle_id.to_string(),
            loaded_quantity: loaded,
            unloaded_quantity: unloaded,
            sales_count,
            sales_total_cents: sales_total,
        })
    }

    // -------------------------------------------------------------------------
    // Rollup queries. Cancelled sales are excluded everywhere.
    // -------------------------------------------------------------------------

    async fn sales_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<SalesSummary> {
        let row: (i64, i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(subtotal_cents), 0),
                COALESCE(SUM(discount_cents), 0),
                COALESCE(SUM(total_cents), 0),
                COALESCE(SUM(paid_cash_cents), 0),
                COALESCE(SUM(paid_cheque_cents), 0),
                COALESCE(SUM(paid_bank_cents), 0),
                COALESCE(SUM(credit_used_cents), 0),
                COALESCE(SUM(outstanding_cents), 0)
            FROM sales
            WHERE status = 'active' AND sale_date >= ?1 AND sale_date < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesSummary {
            sales_count: row.0,
            gross_cents: row.1,
            discount_cents: row.2,
            net_cents: row.3,
            cash_cents: row.4,
            cheque_cents: row.5,
            bank_transfer_cents: row.6,
            credit_used_cents: row.7,
            outstanding_added_cents: row.8,
        })
    }

    /// (count, refunds, cash paid out, balance-due payments received).
    async fn returns_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<(i64, i64, i64, i64)> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(refund_cents), 0),
                COALESCE(SUM(cash_paid_out_cents), 0),
                COALESCE(SUM(payment_amount_cents - change_given_cents), 0)
            FROM returns
            WHERE return_date >= ?1 AND return_date < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn additional_cash(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<i64> {
        let cash: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM additional_payments
            WHERE method = 'cash' AND payment_date >= ?1 AND payment_date < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(cash)
    }

    async fn expenses_total(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM expenses \
             WHERE expense_date >= ?1 AND expense_date < ?2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn category_totals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<CategoryTotal>> {
        let rows: Vec<(ProductCategory, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.category,
                   COALESCE(SUM(si.quantity), 0),
                   COALESCE(SUM(si.line_total_cents), 0)
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.status = 'active' AND s.sale_date >= ?1 AND s.sale_date < ?2
            GROUP BY p.category
            ORDER BY 3 DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(category, quantity, revenue)| CategoryTotal {
                category,
                quantity,
                revenue_cents: revenue,
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::expense::NewExpense;
    use crate::repository::product::NewProduct;
    use crate::repository::returns::{NewReturnedItem, NewSettlement};
    use crate::repository::sale::{NewSale, NewSaleItem};
    use creamline_core::SaleType;

    async fn seeded_db() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(
                NewProduct {
                    sku: "YOG-500".into(),
                    name: "Set Yogurt 500ml".into(),
                    category: ProductCategory::Yogurt,
                    price_cents: 150,
                    wholesale_price_cents: None,
                    stock: 50,
                    reorder_level: 5,
                },
                "staff-1",
            )
            .await
            .unwrap();
        (db, product.id)
    }

    fn cash_sale(product_id: &str, qty: i64, cash: i64) -> NewSale {
        NewSale {
            customer_id: None,
            vehicle_id: None,
            staff_id: "staff-1".into(),
            items: vec![NewSaleItem {
                product_id: product_id.into(),
                sale_type: SaleType::Retail,
                quantity: qty,
            }],
            discount_bps: 0,
            paid_cash_cents: cash,
            paid_cheque_cents: 0,
            cheque_number: None,
            cheque_date: None,
            paid_bank_cents: 0,
            bank_reference: None,
            credit_used_cents: 0,
            sale_date: None,
        }
    }

    #[tokio::test]
    async fn test_day_end_rolls_up_sales_returns_and_expenses() {
        let (db, product_id) = seeded_db().await;

        // 3.00 sale fully paid, 1.50 sale unpaid
        let sale = db.sales().checkout(cash_sale(&product_id, 2, 300)).await.unwrap();
        db.sales().checkout(cash_sale(&product_id, 1, 0)).await.unwrap();

        // Return one unit for 1.50 cash
        db.returns()
            .settle(NewSettlement {
                sale_id: sale.sale.id.clone(),
                staff_id: "staff-1".into(),
                returned_items: vec![NewReturnedItem {
                    product_id: product_id.clone(),
                    sale_type: SaleType::Retail,
                    quantity: 1,
                    resellable: true,
                }],
                exchanged_items: vec![],
                settle_outstanding_cents: 0,
                refund_cents: 0,
                cash_paid_out_cents: 150,
                payment: None,
                idempotency_key: None,
            })
            .await
            .unwrap();

        db.expenses()
            .record(NewExpense {
                description: "Fuel".into(),
                amount_cents: 50,
                category: None,
                expense_date: None,
                staff_id: "staff-1".into(),
            })
            .await
            .unwrap();

        let report = db.reports().day_end(Utc::now().date_naive()).await.unwrap();
        assert_eq!(report.sales.sales_count, 2);
        assert_eq!(report.sales.net_cents, 450);
        assert_eq!(report.sales.cash_cents, 300);
        assert_eq!(report.sales.outstanding_added_cents, 150);
        assert_eq!(report.returns_count, 1);
        assert_eq!(report.cash_paid_out_cents, 150);
        assert_eq!(report.expenses_cents, 50);
        // 300 cash in - 150 paid out - 50 expenses
        assert_eq!(report.net_cash_cents, 100);
    }

    #[tokio::test]
    async fn test_full_report_breaks_out_categories() {
        let (db, yogurt_id) = seeded_db().await;
        let drink = db
            .products()
            .create(
                NewProduct {
                    sku: "MILK-1L".into(),
                    name: "Fresh Milk 1L".into(),
                    category: ProductCategory::Drink,
                    price_cents: 200,
                    wholesale_price_cents: None,
                    stock: 20,
                    reorder_level: 2,
                },
                "staff-1",
            )
            .await
            .unwrap();

        db.sales().checkout(cash_sale(&yogurt_id, 2, 300)).await.unwrap();
        db.sales().checkout(cash_sale(&drink.id, 3, 600)).await.unwrap();

        let today = Utc::now().date_naive();
        let report = db.reports().full(today, today).await.unwrap();
        assert_eq!(report.sales.sales_count, 2);
        assert_eq!(report.categories.len(), 2);

        // Ordered by revenue, drink (6.00) before yogurt (3.00)
        assert_eq!(report.categories[0].category, ProductCategory::Drink);
        assert_eq!(report.categories[0].revenue_cents, 600);
        assert_eq!(report.categories[1].revenue_cents, 300);
    }

    #[tokio::test]
    async fn test_cancelled_sales_excluded_from_rollups() {
        let (db, product_id) = seeded_db().await;

        let sale = db.sales().checkout(cash_sale(&product_id, 2, 300)).await.unwrap();
        db.sales().cancel(&sale.sale.id, "staff-1").await.unwrap();

        let report = db.reports().day_end(Utc::now().date_naive()).await.unwrap();
        assert_eq!(report.sales.sales_count, 0);
        assert_eq!(report.sales.net_cents, 0);
    }

    #[tokio::test]
    async fn test_vehicle_report_tracks_loads_and_sales() {
        let (db, product_id) = seeded_db().await;
        let vehicle = db
            .vehicles()
            .create(crate::repository::vehicle::NewVehicle {
                vehicle_number: "CL-01".into(),
                driver_name: "Driver One".into(),
                notes: None,
            })
            .await
            .unwrap();

        db.stock()
            .load_to_vehicle(&product_id, 10, &vehicle.id, "staff-1", None)
            .await
            .unwrap();
        db.stock()
            .unload_from_vehicle(&product_id, 4, &vehicle.id, "staff-1", None)
            .await
            .unwrap();

        let mut sale = cash_sale(&product_id, 2, 300);
        sale.vehicle_id = Some(vehicle.id.clone());
        db.sales().checkout(sale).await.unwrap();

        let report = db.reports().vehicle(&vehicle.id).await.unwrap();
        assert_eq!(report.loaded_quantity, 10);
        assert_eq!(report.unloaded_quantity, 4);
        assert_eq!(report.sales_count, 1);
        assert_eq!(report.sales_total_cents, 300);
    }
}
