//! # Domain Types
//!
//! Core domain types used throughout Creamline POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌────────────────┐   ┌────────────────┐   ┌─────────────────────┐     │
//! │  │    Product     │   │      Sale      │   │  ReturnTransaction  │     │
//! │  │  ────────────  │   │  ────────────  │   │  ─────────────────  │     │
//! │  │  id (UUID)     │   │  id (UUID)     │   │  id (UUID)          │     │
//! │  │  sku           │   │  status        │   │  original_sale_id   │     │
//! │  │  category      │   │  payment split │   │  settlement figures │     │
//! │  │  stock >= 0    │   │  outstanding   │   │  (immutable)        │     │
//! │  └────────────────┘   └────────────────┘   └─────────────────────┘     │
//! │                                                                         │
//! │  ┌────────────────┐   ┌────────────────────┐   ┌────────────────┐      │
//! │  │  SaleItem      │   │  StockTransaction  │   │  Customer      │      │
//! │  │  (snapshot)    │   │  (append-only)     │   │  (credit is    │      │
//! │  │                │   │  prev/new stock    │   │   derived)     │      │
//! │  └────────────────┘   └────────────────────┘   └────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Sale and return line items copy product name/sku/price at transaction
//! time, so history survives later catalog edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product Category
// =============================================================================

/// Catalog category for dairy products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Yogurt,
    Drink,
    IceCream,
    Dessert,
    Curd,
    Other,
}

impl Default for ProductCategory {
    fn default() -> Self {
        ProductCategory::Other
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Invariant: `stock >= 0` at all times. Every mutation that would violate
/// this must fail atomically, leaving stock untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown at the till and on receipts.
    pub name: String,

    /// Catalog category.
    pub category: ProductCategory,

    /// Retail price in cents.
    pub price_cents: i64,

    /// Wholesale price in cents, when the product is sold to shops.
    pub wholesale_price_cents: Option<i64>,

    /// Current main-inventory stock level. Never negative.
    pub stock: i64,

    /// Reorder threshold for low-stock reporting.
    pub reorder_level: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the retail price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the price applied for a given sale type.
    ///
    /// Wholesale falls back to the retail price when no wholesale price is
    /// configured.
    pub fn price_for(&self, sale_type: SaleType) -> Money {
        match sale_type {
            SaleType::Retail => self.price(),
            SaleType::Wholesale => {
                Money::from_cents(self.wholesale_price_cents.unwrap_or(self.price_cents))
            }
        }
    }

    /// Whether current stock covers the requested quantity.
    #[inline]
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Whether stock has fallen to or below the reorder threshold.
    #[inline]
    pub fn needs_reorder(&self) -> bool {
        self.stock <= self.reorder_level
    }
}

// =============================================================================
// Sale Status / Sale Type / Payment Method
// =============================================================================

/// The status of a sale. Sales are never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Completed and in force.
    Active,
    /// Cancelled: stock reversed, outstanding zeroed.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Active
    }
}

/// Pricing tier applied to a sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    Retail,
    Wholesale,
}

impl Default for SaleType {
    fn default() -> Self {
        SaleType::Retail
    }
}

/// Closed set of payment methods.
///
/// The original system discriminated payment kinds with free-form strings;
/// consumption sites here match exhaustively instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Cheque,
    BankTransfer,
    /// Paid from the customer's accumulated return credit.
    Credit,
}

impl PaymentMethod {
    /// Human-readable label used in payment summary strings.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Cheque => "Cheque",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Credit => "Credit",
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Header only; line items and additional payments live in
/// child records.
///
/// Invariant: `total_paid_cents + outstanding_cents == total_cents`, exactly
/// (integer cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub status: SaleStatus,

    /// Sum of line totals before discount.
    pub subtotal_cents: i64,
    /// Percentage discount in basis points (1000 = 10%).
    pub discount_bps: u32,
    /// Discount amount actually deducted.
    pub discount_cents: i64,
    /// Amount due after discount.
    pub total_cents: i64,

    // Payment breakdown at checkout
    pub paid_cash_cents: i64,
    pub paid_cheque_cents: i64,
    pub cheque_number: Option<String>,
    pub cheque_date: Option<String>,
    pub paid_bank_cents: i64,
    pub bank_reference: Option<String>,
    /// Portion settled from the customer's accumulated return credit.
    pub credit_used_cents: i64,

    /// All payments received to date, including additional payments.
    pub total_paid_cents: i64,
    /// Remainder owed by the customer. Zeroed on cancellation.
    pub outstanding_cents: i64,
    /// Derived human-readable summary, e.g.
    /// `"Partial (Cash (500.00)) - Outstanding: 300.00"`.
    pub payment_summary: String,

    /// Set when stock was sourced from a vehicle's load rather than main
    /// inventory.
    pub vehicle_id: Option<String>,

    pub sale_date: DateTime<Utc>,
    pub staff_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }

    #[inline]
    pub fn is_vehicle_sourced(&self) -> bool {
        self.vehicle_id.is_some()
    }

    #[inline]
    pub fn outstanding(&self) -> Money {
        Money::from_cents(self.outstanding_cents)
    }
}

/// A line item on a sale. Product details are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Pricing tier for this line.
    pub sale_type: SaleType,
    /// Unit price applied, in cents (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A follow-up payment recorded against an existing sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AdditionalPayment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Cheque number, transfer reference, etc.
    pub details: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub staff_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Return / Exchange
// =============================================================================

/// A settlement event against a prior sale. Immutable after creation; this
/// is the historical record a receipt is reprinted from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReturnTransaction {
    pub id: String,
    pub original_sale_id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub return_date: DateTime<Utc>,
    pub staff_id: String,

    // Settlement figures, captured verbatim for audit/receipt purposes
    pub return_total_cents: i64,
    pub exchange_total_cents: i64,
    /// Portion of return credit applied to existing outstanding balance.
    pub settle_outstanding_cents: i64,
    /// Credit added to the customer's account.
    pub refund_cents: i64,
    /// Cash handed back over the counter.
    pub cash_paid_out_cents: i64,
    /// Balance due from the customer when the exchange exceeded the return.
    pub balance_due_cents: i64,

    // Payment taken for any balance due
    pub payment_amount_cents: i64,
    pub payment_summary: String,
    pub change_given_cents: i64,
    pub payment_details: Option<String>,

    /// Client-supplied dedup token. A resubmission with the same key returns
    /// this record instead of applying the settlement twice.
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// An item handed back by the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReturnedItem {
    pub id: String,
    pub return_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub category: ProductCategory,
    pub sale_type: SaleType,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Controls whether stock is restored. Non-resellable items are wastage.
    pub resellable: bool,
}

impl ReturnedItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

/// An item the customer took in exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ExchangedItem {
    pub id: String,
    pub return_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub category: ProductCategory,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl ExchangedItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

// =============================================================================
// Stock Transactions
// =============================================================================

/// Kind of inventory ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTransactionType {
    AddStockInventory,
    LoadToVehicle,
    UnloadFromVehicle,
    RemoveStockWastage,
    StockAdjustmentManual,
    IssueSample,
}

/// An immutable inventory ledger entry. Append-only audit log; never mutated
/// or deleted once written.
///
/// `previous_stock == new_stock` is legal and meaningful: vehicle-side
/// movements and wastage on returns change only the audit trail, not main
/// inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockTransaction {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    pub tx_type: StockTransactionType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub vehicle_id: Option<String>,
    pub staff_id: String,
}

// =============================================================================
// Customer / Vehicle / Expense
// =============================================================================

/// A customer record. Outstanding balance and available credit are derived
/// by aggregation, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub shop_name: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A distribution vehicle. Referenced by sales and stock transactions when
/// distribution happens off a vehicle rather than main inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub vehicle_number: String,
    pub driver_name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An operating expense, rolled into day-end reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub expense_date: DateTime<Utc>,
    pub staff_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

/// A staff login. Password hashes are argon2; verification happens behind
/// the [`crate::auth::CredentialStore`] seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64) -> Product {
        Product {
            id: "p1".into(),
            sku: "YOG-500".into(),
            name: "Set Yogurt 500ml".into(),
            category: ProductCategory::Yogurt,
            price_cents: 150,
            wholesale_price_cents: Some(120),
            stock,
            reorder_level: 10,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_for_sale_type() {
        let p = product(20);
        assert_eq!(p.price_for(SaleType::Retail).cents(), 150);
        assert_eq!(p.price_for(SaleType::Wholesale).cents(), 120);

        let mut no_wholesale = product(20);
        no_wholesale.wholesale_price_cents = None;
        assert_eq!(no_wholesale.price_for(SaleType::Wholesale).cents(), 150);
    }

    #[test]
    fn test_can_supply_and_reorder() {
        let p = product(10);
        assert!(p.can_supply(10));
        assert!(!p.can_supply(11));
        assert!(p.needs_reorder());
        assert!(!product(11).needs_reorder());
    }

    #[test]
    fn test_stock_transaction_type_wire_format() {
        let json = serde_json::to_string(&StockTransactionType::LoadToVehicle).unwrap();
        assert_eq!(json, "\"LOAD_TO_VEHICLE\"");

        let parsed: StockTransactionType =
            serde_json::from_str("\"REMOVE_STOCK_WASTAGE\"").unwrap();
        assert_eq!(parsed, StockTransactionType::RemoveStockWastage);
    }

    #[test]
    fn test_payment_method_labels() {
        assert_eq!(PaymentMethod::Cash.label(), "Cash");
        assert_eq!(PaymentMethod::BankTransfer.label(), "Bank Transfer");
    }
}
