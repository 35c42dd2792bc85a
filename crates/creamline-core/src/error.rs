//! # Error Types
//!
//! Domain-specific error types for creamline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                    │
//! │                                                                         │
//! │  creamline-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  creamline-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP API errors (apps/server)                                         │
//! │  └── ApiError         - What callers see (JSON + status code)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to a caller-facing message and HTTP status

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or structurally invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A settlement request with no returned items, no exchanged items and
    /// no non-zero financial fields. A no-op request is rejected outright.
    #[error("Empty transaction: nothing to return, exchange, or settle")]
    EmptyTransaction,

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer not found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Vehicle not found.
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    /// Operating on a sale that has already been cancelled.
    #[error("Sale {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Insufficient stock to complete the operation.
    ///
    /// ## When This Occurs
    /// - Checkout or exchange debits more than available stock
    /// - Loading a vehicle or removing wastage beyond current stock
    ///
    /// The whole enclosing transaction aborts; stock is never left negative.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Returned quantity exceeds what the original sale line sold.
    #[error(
        "Return quantity {requested} for product {product_id} exceeds quantity sold ({sold})"
    )]
    ReturnExceedsSold {
        product_id: String,
        sold: i64,
        requested: i64,
    },

    /// The caller-supplied refund split does not add up to the refund due.
    ///
    /// `cash_paid_out + refund_amount` must equal the computed refund;
    /// anything else would let the books drift from the settlement.
    #[error(
        "Refund split mismatch: cash {cash_paid_out_cents} + credit {refund_cents} != due {due_cents}"
    )]
    RefundSplitMismatch {
        cash_paid_out_cents: i64,
        refund_cents: i64,
        due_cents: i64,
    },

    /// Payment amount is invalid (negative, or exceeds what is owed).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A backing store failed behind a core trait seam (e.g. the credential
    /// store). Carries the store's message; callers treat it as internal.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "YOG-500".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for YOG-500: available 3, requested 5"
        );

        let err = CoreError::AlreadyCancelled("sale-1".to_string());
        assert_eq!(err.to_string(), "Sale sale-1 is already cancelled");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "staffId".to_string(),
        };
        assert_eq!(err.to_string(), "staffId is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
