//! # Mercadinho Server Library
//!
//! HTTP surface for the self-service storefront SPA and its back-office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         mercadinho-server                               │
//! │                                                                         │
//! │  SPA (kiosk + admin)                                                    │
//! │       │  JSON over HTTP                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  routes::router()                                                │  │
//! │  │  products · cart · customer · checkout · admin · reports         │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 │ State<AppState<P>>                    │
//! │       ┌─────────────────────────┼──────────────────────────┐           │
//! │       ▼                         ▼                          ▼            │
//! │  CheckoutService<P>      IntegrationManager<P>        Database          │
//! │  (mercadinho-payments)   (credentials, status)        (mercadinho-db)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers stay thin: parse, call one service method, map the error.

pub mod error;
pub mod routes;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `info,mercadinho=debug,sqlx=warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mercadinho=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
