//! # Payment Provider
//!
//! The seam between the workflows and Mercado Pago. Workflows only see
//! the [`PaymentProvider`] trait and the domain types below; JSON shapes
//! live in [`wire`], HTTP in [`mercado_pago`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PixWorkflow ─┐                                                         │
//! │  CardWorkflow ┼──► PaymentProvider ──► MercadoPagoClient ──► REST API   │
//! │  Integration ─┘        (trait)            (reqwest)                     │
//! │  Manager                  ▲                                             │
//! │                           └── scripted fakes in tests                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call takes the access token explicitly: credentials change at
//! runtime from the admin panel and the client holds no secrets.

pub mod mercado_pago;
pub mod wire;

use std::future::Future;

use chrono::{DateTime, Utc};
use mercadinho_core::Money;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::PaymentResult;

pub use mercado_pago::MercadoPagoClient;

// =============================================================================
// PIX
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixChargeRequest {
    pub amount: Money,
    pub description: String,
    pub payer_email: String,
    /// Our order id.
    pub external_reference: String,
}

/// Status of a PIX charge, collapsed to what checkout cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PixStatus {
    Pending,
    Approved,
    Rejected,
}

impl PixStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PixStatus::Pending => "pending",
            PixStatus::Approved => "approved",
            PixStatus::Rejected => "rejected",
        }
    }
}

/// A created PIX charge with its QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixCharge {
    pub payment_id: String,
    pub status: PixStatus,
    /// Copy-and-paste payload.
    pub qr_code: String,
    /// PNG, base64 encoded.
    pub qr_code_base64: String,
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Point (card terminal)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardIntentRequest {
    pub amount: Money,
    pub description: String,
    pub device_id: String,
    pub external_reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
    Cancelled,
}

impl IntentStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Approved | IntentStatus::Rejected | IntentStatus::Cancelled
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Processing => "processing",
            IntentStatus::Approved => "approved",
            IntentStatus::Rejected => "rejected",
            IntentStatus::Cancelled => "cancelled",
        }
    }
}

/// A payment intent sent to a Point terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardIntent {
    pub id: String,
    pub amount_cents: i64,
    pub status: IntentStatus,
    pub device_id: Option<String>,
    pub external_reference: Option<String>,
    /// Payment created by the terminal, once there is one.
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Busy,
    Offline,
}

/// A Point card terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PointDevice {
    pub id: String,
    pub name: String,
    pub status: DeviceStatus,
    pub battery_level: Option<u8>,
    #[ts(as = "Option<String>")]
    pub last_seen: Option<DateTime<Utc>>,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Operations the checkout needs from a payment provider.
///
/// `idempotency_key` is supplied by the caller so a retried attempt can
/// deliberately use a fresh one.
pub trait PaymentProvider: Send + Sync + 'static {
    fn create_pix_charge(
        &self,
        access_token: &str,
        request: &PixChargeRequest,
        idempotency_key: &str,
    ) -> impl Future<Output = PaymentResult<PixCharge>> + Send;

    fn pix_status(
        &self,
        access_token: &str,
        payment_id: &str,
    ) -> impl Future<Output = PaymentResult<PixStatus>> + Send;

    /// Lightweight authenticated read used to test checkout credentials.
    /// Returns the number of payment methods listed.
    fn list_payment_methods(
        &self,
        access_token: &str,
    ) -> impl Future<Output = PaymentResult<usize>> + Send;

    fn list_devices(
        &self,
        access_token: &str,
    ) -> impl Future<Output = PaymentResult<Vec<PointDevice>>> + Send;

    fn create_card_intent(
        &self,
        access_token: &str,
        request: &CardIntentRequest,
        idempotency_key: &str,
    ) -> impl Future<Output = PaymentResult<CardIntent>> + Send;

    fn card_intent(
        &self,
        access_token: &str,
        intent_id: &str,
    ) -> impl Future<Output = PaymentResult<CardIntent>> + Send;

    fn cancel_card_intent(
        &self,
        access_token: &str,
        device_id: &str,
        intent_id: &str,
    ) -> impl Future<Output = PaymentResult<()>> + Send;

    /// Switches a terminal to PDV (integrated) operating mode.
    fn activate_device(
        &self,
        access_token: &str,
        device_id: &str,
    ) -> impl Future<Output = PaymentResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_terminal_states() {
        assert!(!IntentStatus::Pending.is_terminal());
        assert!(!IntentStatus::Processing.is_terminal());
        assert!(IntentStatus::Approved.is_terminal());
        assert!(IntentStatus::Rejected.is_terminal());
        assert!(IntentStatus::Cancelled.is_terminal());
    }
}
