//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Mercadinho                             │
//! │                                                                         │
//! │  SPA                         Rust Backend                               │
//! │  ───                         ────────────                               │
//! │                                                                         │
//! │  POST /api/checkout/order                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  PaymentError::NotConfigured ──► CONFIGURATION_ERROR (409) ─────►│  │
//! │  │  PaymentError::Timeout ────────► TIMEOUT (504) ─────────────────►│  │
//! │  │  PaymentError::Rejected ───────► PAYMENT_FAILED (502) ──────────►│  │
//! │  │  DbError::InsufficientStock ───► INSUFFICIENT_STOCK (409) ──────►│  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "CONFIGURATION_ERROR", "message": "Forma de pagamento ..." } │
//! │  CONFIGURATION_ERROR   → link to the admin integrations page            │
//! │  PAYMENT_FAILED/TIMEOUT → "tentar novamente" button                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mercadinho_core::{CoreError, ValidationError};
use mercadinho_db::DbError;
use mercadinho_payments::PaymentError;
use serde::Serialize;
use tracing::{error, warn};

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error body returned by every failing handler.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 0b0c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Business rule violated (422)
    BusinessLogic,

    /// Cart operation failed (422)
    CartError,

    /// Insufficient stock (409)
    InsufficientStock,

    /// Integration missing or switched off (409)
    ConfigurationError,

    /// Another payment is running, or no order fits the request (409)
    CheckoutConflict,

    /// Provider rejected or could not be reached (502)
    PaymentFailed,

    /// Payment not confirmed in time (504)
    Timeout,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::BusinessLogic | ErrorCode::CartError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InsufficientStock
            | ErrorCode::ConfigurationError
            | ErrorCode::CheckoutConflict => StatusCode::CONFLICT,
            ErrorCode::PaymentFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Conversions
// =============================================================================

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Estoque insuficiente para {}: {} disponível, {} solicitado",
                    product_id, available, requested
                ),
            ),
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::CheckViolation { message } => {
                error!("Check constraint failed: {}", message);
                ApiError::new(ErrorCode::BusinessLogic, "Order totals are inconsistent")
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            other => {
                // Log the actual error but return a generic message
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::EmptyCart
            | CoreError::NotInCart(_)
            | CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, err.to_string()),
            CoreError::QuantityTooLarge { .. } => ApiError::validation(err.to_string()),
            CoreError::InvalidOrderTransition { .. } | CoreError::TotalMismatch { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Database(e) => e.into(),
            PaymentError::Core(e) => e.into(),
            PaymentError::Validation(e) => e.into(),
            e if e.is_config_error() => {
                warn!(error = %e, "Payment integration not usable");
                ApiError::new(ErrorCode::ConfigurationError, e.user_message())
            }
            e @ (PaymentError::Timeout { .. } | PaymentError::Expired) => {
                ApiError::new(ErrorCode::Timeout, e.user_message())
            }
            e @ (PaymentError::CheckoutBusy
            | PaymentError::NoOpenOrder
            | PaymentError::MethodMismatch { .. }) => {
                ApiError::new(ErrorCode::CheckoutConflict, e.user_message())
            }
            e => {
                warn!(error = %e, "Payment provider call failed");
                ApiError::new(ErrorCode::PaymentFailed, e.user_message())
            }
        }
    }
}
