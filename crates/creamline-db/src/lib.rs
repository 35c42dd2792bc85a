//! # creamline-db: Database Layer for Creamline POS
//!
//! This crate provides database access for the Creamline POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Creamline POS Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /returns)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   creamline-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (returns.rs,  │    │  (embedded)  │  │   │
//! │  │   │               │    │  sale.rs, ...) │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ transaction   │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ scopes        │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations per aggregate
//!
//! ## Transaction Discipline
//!
//! Every multi-entity mutation (checkout, settlement, cancellation, stock
//! moves) runs inside a single sqlx transaction. Business errors raised
//! mid-transaction abort the whole scope; stock is never left inconsistent.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;
pub use repository::user::UserRepository;
pub use repository::vehicle::VehicleRepository;
