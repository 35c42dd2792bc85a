//! HTTP error mapping.
//!
//! ## Status Mapping
//! ```text
//! 400  InvalidRequest, EmptyTransaction, RefundSplitMismatch,
//!      InvalidPaymentAmount, ReturnExceedsSold, validation failures
//! 404  *NotFound
//! 409  AlreadyCancelled, InsufficientStock, unique/foreign-key violations
//! 500  storage failures, StoreUnavailable
//! ```
//!
//! Body shape: `{ "error": string, "details"?: string }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use creamline_core::CoreError;
use creamline_db::DbError;

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An error ready to leave the server as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        ApiError {
            status,
            body: ErrorBody {
                error: error.into(),
                details: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::InvalidRequest(_)
            | CoreError::EmptyTransaction
            | CoreError::RefundSplitMismatch { .. }
            | CoreError::InvalidPaymentAmount { .. }
            | CoreError::ReturnExceedsSold { .. }
            | CoreError::Validation(_) => StatusCode::BAD_REQUEST,

            CoreError::ProductNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::VehicleNotFound(_) => StatusCode::NOT_FOUND,

            CoreError::AlreadyCancelled(_) | CoreError::InsufficientStock { .. } => {
                StatusCode::CONFLICT
            }

            CoreError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "Internal error");
            // Internal detail stays in the log
            return ApiError::new(status, "Internal server error");
        }

        ApiError::new(status, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),

            DbError::NotFound { .. } => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),

            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ApiError::new(StatusCode::CONFLICT, err.to_string())
            }

            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => {
                error!(error = %err, "Storage failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_expected_statuses() {
        let split = ApiError::from(CoreError::RefundSplitMismatch {
            cash_paid_out_cents: 100,
            refund_cents: 0,
            due_cents: 150,
        });
        assert_eq!(split.status, StatusCode::BAD_REQUEST);

        let missing = ApiError::from(CoreError::SaleNotFound("s1".into()));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let cancelled = ApiError::from(CoreError::AlreadyCancelled("s1".into()));
        assert_eq!(cancelled.status, StatusCode::CONFLICT);

        let storage = ApiError::from(CoreError::StoreUnavailable("disk".into()));
        assert_eq!(storage.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.body.error, "Internal server error");
    }

    #[test]
    fn test_db_errors_unwrap_domain_and_mask_internal() {
        let nested = ApiError::from(DbError::Domain(CoreError::EmptyTransaction));
        assert_eq!(nested.status, StatusCode::BAD_REQUEST);

        let internal = ApiError::from(DbError::Internal("oops".into()));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.body.error.contains("oops"));
    }
}
