//! # creamline-core: Pure Business Logic for Creamline POS
//!
//! This crate is the **heart** of Creamline POS. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Creamline POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   HTTP API (apps/server)                        │   │
//! │  │    POST /sales ── POST /returns ── PATCH /sales/{id} ── ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ creamline-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │   money   │  │ settlement │  │ validation│ │   │
//! │  │   │  Product  │  │   Money   │  │  engine +  │  │   rules   │ │   │
//! │  │   │   Sale    │  │  (cents)  │  │ stock plan │  │   checks  │ │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  creamline-db (Database Layer)                  │   │
//! │  │           SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, ReturnTransaction, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`settlement`] - Return/exchange settlement engine and stock planning
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`auth`] - Credential store seam
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod money;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use settlement::{
    CancellationPlan, Settlement, SettlementOutcome, SettlementPlan, SettlementRequest,
    StockEffect,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single sale.
///
/// ## Business Reason
/// Prevents runaway checkouts and keeps receipts printable.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Guards against fat-finger entries (1000 crates instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
