//! # mercadinho-payments: Payment Finalization for Mercadinho
//!
//! Takes a cart to a paid order through Mercado Pago: PIX QR codes via the
//! Checkout API and card payments on Point terminals.
//!
//! ## Payment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Customer picks a method                                                │
//! │       │   IntegrationManager::available_payment_methods()               │
//! │       ▼                                                                 │
//! │  CheckoutService::open_order() ──► OrderRepository::create()            │
//! │       │                            (pending, stock taken)               │
//! │       ├── pix ──► PixWorkflow ──► QR + 300s countdown + status poll     │
//! │       │                                                                 │
//! │       └── credit/debit ──► CardWorkflow ──► intent on terminal + poll   │
//! │                                                                         │
//! │  approved ──► order approved, cart cleared                              │
//! │  rejected / expired / timeout ──► retry on the same order               │
//! │  close ──► task cancelled, open intent cancelled, rejected if seen      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`checkout`] - Session state and the storefront operations
//! - [`pix`] - PIX workflow
//! - [`card`] - Point card-terminal workflow
//! - [`credentials`] - Checkout/Point credential sets and their status
//! - [`poller`] - Cancellable fixed-interval polling
//! - [`provider`] - Provider trait and the Mercado Pago client
//! - [`observer`] - Workflow state notifications
//! - [`config`] - Process configuration
//! - [`error`] - Payment error types

pub mod card;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod error;
pub mod observer;
pub mod pix;
pub mod poller;
pub mod provider;

#[cfg(test)]
pub(crate) mod testing;

pub use card::{CardOutcome, CardState, CardWorkflow};
pub use checkout::{CheckoutService, CheckoutSession, PaymentState};
pub use config::PaymentsConfig;
pub use credentials::{
    CheckoutCredentials, ConnectionTestResult, CredentialSet, Credentials, Environment,
    IntegrationManager, IntegrationStatus, PointCredentials, TestStatus,
};
pub use error::{PaymentError, PaymentResult};
pub use observer::{NoOpObserver, WorkflowObserver};
pub use pix::{PixOutcome, PixState, PixWorkflow};
pub use poller::{cancel_pair, CancelHandle, CancelToken, PollPolicy};
pub use provider::{MercadoPagoClient, PaymentProvider, PointDevice};
