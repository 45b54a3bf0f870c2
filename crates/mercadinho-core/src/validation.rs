//! # Validation Module
//!
//! Input validation for values arriving from the storefront and back-office.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: SPA forms            basic format checks, instant feedback    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Rust (THIS MODULE)   business rules, totals recomputed        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite               CHECK / FOREIGN KEY / conditional UPDATE │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::PaymentMethod;
use crate::{MAX_INSTALLMENTS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an expense description: non-empty, at most 500 characters.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::required("description"));
    }

    if description.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: 500,
        });
    }

    Ok(())
}

/// Loose e-mail check for the PIX payer field.
///
/// ```rust
/// use mercadinho_core::validation::validate_email;
///
/// assert!(validate_email("cliente@mercadinho.com.br").is_ok());
/// assert!(validate_email("cliente").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity: `1..=999`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that must be charged or recorded (> 0).
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage in basis points: `0..=10000`.
pub fn validate_rate_bps(field: &str, bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates the installment count for a payment method.
///
/// PIX and debit are always paid at once; credit allows 1x to 10x.
pub fn validate_installments(method: PaymentMethod, installments: i64) -> ValidationResult<()> {
    let max = match method {
        PaymentMethod::Credit => MAX_INSTALLMENTS,
        PaymentMethod::Pix | PaymentMethod::Debit => 1,
    };

    if !(1..=max).contains(&installments) {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}
