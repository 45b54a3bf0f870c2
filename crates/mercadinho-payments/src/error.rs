//! # Payment Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Payment Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Provider      │  │  Transport / Time       │ │
//! │  │  (never retry)  │  │  (user retries) │  │  (retryable)            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotConfigured  │  │  Rejected       │  │  Http                   │ │
//! │  │  MethodUnavail. │  │  Api            │  │  Timeout                │ │
//! │  │  Config         │  │                 │  │  Expired                │ │
//! │  │  Validation     │  │                 │  │  NoDevicesOnline        │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │  Persistence    │  │  Checkout flow                              │  │
//! │  │  Database, Core │  │  CheckoutBusy, NoOpenOrder, MethodMismatch  │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mercadinho_core::{CoreError, PaymentMethod, ValidationError};
use mercadinho_db::DbError;
use thiserror::Error;

use crate::credentials::CredentialSet;

/// Result type alias for payment operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// The integration is missing required fields or is switched off.
    #[error("Integration '{set}' is not configured or not active")]
    NotConfigured { set: CredentialSet },

    /// The chosen method is not offered by the active integrations.
    #[error("Payment method '{method}' is not available")]
    MethodUnavailable { method: PaymentMethod },

    /// Invalid application configuration (TOML, env, URLs).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Credentials failed validation.
    #[error("Invalid credentials: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// The provider reached a final rejected status.
    #[error("Payment rejected: {message}")]
    Rejected { message: String },

    /// The provider answered with a non-2xx status.
    #[error("Provider error {status}: {message}")]
    Api { status: u16, message: String },

    /// A 2xx body that does not match the expected shape.
    #[error("Unexpected provider response: {0}")]
    Parse(String),

    // =========================================================================
    // Transport / Time Errors
    // =========================================================================
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Status polling ran out of attempts without a final status.
    #[error("Payment not confirmed after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// The PIX countdown reached zero.
    #[error("PIX charge expired")]
    Expired,

    #[error("No card terminal is online")]
    NoDevicesOnline,

    // =========================================================================
    // Persistence
    // =========================================================================
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Checkout Flow
    // =========================================================================
    /// A payment task is already running for this checkout.
    #[error("A payment is already in progress")]
    CheckoutBusy,

    #[error("No open order in this checkout")]
    NoOpenOrder,

    #[error("Order is paid with '{order}', not '{requested}'")]
    MethodMismatch {
        order: PaymentMethod,
        requested: PaymentMethod,
    },
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for PaymentError {
    fn from(err: std::io::Error) -> Self {
        PaymentError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for PaymentError {
    fn from(err: toml::de::Error) -> Self {
        PaymentError::Config(err.to_string())
    }
}

impl From<url::ParseError> for PaymentError {
    fn from(err: url::ParseError) -> Self {
        PaymentError::Config(format!("invalid URL: {err}"))
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl PaymentError {
    /// Returns true if trying again (usually by the customer) can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Rejected { .. }
                | PaymentError::Api { .. }
                | PaymentError::Http(_)
                | PaymentError::Timeout { .. }
                | PaymentError::Expired
                | PaymentError::NoDevicesOnline
        )
    }

    /// Returns true if an administrator has to fix the integration settings.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PaymentError::NotConfigured { .. }
                | PaymentError::MethodUnavailable { .. }
                | PaymentError::Config(_)
                | PaymentError::Validation(_)
        )
    }

    /// Message shown to the customer at the kiosk.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::NotConfigured { .. } | PaymentError::MethodUnavailable { .. } => {
                "Forma de pagamento indisponível. Configure a integração no painel administrativo."
                    .to_string()
            }
            PaymentError::Config(_) | PaymentError::Validation(_) => {
                "Configuração de pagamento inválida. Verifique o painel administrativo.".to_string()
            }
            PaymentError::Rejected { .. } => {
                "Pagamento recusado. Tente novamente ou escolha outra forma de pagamento."
                    .to_string()
            }
            PaymentError::Api { .. } | PaymentError::Parse(_) => {
                "Erro ao comunicar com o Mercado Pago. Tente novamente.".to_string()
            }
            PaymentError::Http(_) => {
                "Falha de conexão com o Mercado Pago. Tente novamente.".to_string()
            }
            PaymentError::Timeout { .. } => {
                "Tempo esgotado aguardando a confirmação do pagamento. Tente novamente.".to_string()
            }
            PaymentError::Expired => "O QR Code PIX expirou. Gere um novo código.".to_string(),
            PaymentError::NoDevicesOnline => {
                "Nenhuma maquininha online. Verifique o terminal e tente novamente.".to_string()
            }
            PaymentError::Database(DbError::InsufficientStock { .. })
            | PaymentError::Core(CoreError::InsufficientStock { .. }) => {
                "Estoque insuficiente para um dos produtos do carrinho.".to_string()
            }
            PaymentError::Database(_) => "Erro ao salvar o pedido. Tente novamente.".to_string(),
            PaymentError::Core(CoreError::EmptyCart) => "O carrinho está vazio.".to_string(),
            PaymentError::Core(e) => e.to_string(),
            PaymentError::CheckoutBusy => "Já existe um pagamento em andamento.".to_string(),
            PaymentError::NoOpenOrder | PaymentError::MethodMismatch { .. } => {
                "Nenhum pedido aberto para esta forma de pagamento.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let not_configured = PaymentError::NotConfigured {
            set: CredentialSet::Point,
        };
        assert!(not_configured.is_config_error());
        assert!(!not_configured.is_retryable());

        assert!(PaymentError::Timeout { attempts: 60 }.is_retryable());
        assert!(PaymentError::Expired.is_retryable());
        assert!(PaymentError::NoDevicesOnline.is_retryable());
        assert!(PaymentError::Rejected {
            message: "cc_rejected_insufficient_amount".into()
        }
        .is_retryable());

        assert!(!PaymentError::CheckoutBusy.is_retryable());
        assert!(!PaymentError::CheckoutBusy.is_config_error());
    }

    #[test]
    fn test_user_message_is_portuguese() {
        let msg = PaymentError::MethodUnavailable {
            method: PaymentMethod::Credit,
        }
        .user_message();
        assert!(msg.contains("painel administrativo"));

        let msg = PaymentError::Database(DbError::InsufficientStock {
            product_id: "p".into(),
            available: 0,
            requested: 1,
        })
        .user_message();
        assert!(msg.starts_with("Estoque insuficiente"));
    }

    #[test]
    fn test_error_display() {
        let err = PaymentError::Api {
            status: 401,
            message: "invalid access token".into(),
        };
        assert_eq!(err.to_string(), "Provider error 401: invalid access token");
    }
}
