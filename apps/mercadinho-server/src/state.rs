//! # Application State
//!
//! Everything the handlers share, behind one `Arc`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  AppState<P> (Clone, one Arc)                                           │
//! │     │                                                                   │
//! │     ├── Database ─────────────── products, expenses, reports            │
//! │     ├── FeeTable ─────────────── cash-flow fees                         │
//! │     ├── IntegrationManager<P> ── admin credentials panel                │
//! │     ├── CardWorkflow<P> ──────── admin device activation                │
//! │     └── CheckoutService<P> ───── cart, customer, order, payment         │
//! │                                                                         │
//! │  P = MercadoPagoClient in production, a stub provider in tests.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use mercadinho_core::FeeTable;
use mercadinho_db::Database;
use mercadinho_payments::{
    CardWorkflow, CheckoutService, IntegrationManager, PaymentProvider, PaymentResult,
    PaymentsConfig, PixWorkflow,
};

pub struct AppState<P> {
    inner: Arc<AppStateInner<P>>,
}

struct AppStateInner<P> {
    db: Database,
    fees: FeeTable,
    integrations: Arc<IntegrationManager<P>>,
    card: Arc<CardWorkflow<P>>,
    checkout: CheckoutService<P>,
}

// Derived Clone would require `P: Clone`.
impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: PaymentProvider> AppState<P> {
    /// Loads stored credentials and wires the workflows around `provider`.
    pub async fn build(db: Database, config: &PaymentsConfig, provider: P) -> PaymentResult<Self> {
        let provider = Arc::new(provider);
        let integrations =
            Arc::new(IntegrationManager::load(provider.clone(), db.settings()).await?);

        let pix = Arc::new(PixWorkflow::new(
            provider.clone(),
            db.clone(),
            config.pix.clone(),
        ));
        let card = Arc::new(CardWorkflow::new(provider, db.clone(), config.card.clone()));

        let checkout = CheckoutService::new(
            db.clone(),
            integrations.clone(),
            pix,
            card.clone(),
            config.payer_email_fallback.clone(),
        );

        Ok(AppState {
            inner: Arc::new(AppStateInner {
                db,
                fees: config.fees.clone(),
                integrations,
                card,
                checkout,
            }),
        })
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn fees(&self) -> &FeeTable {
        &self.inner.fees
    }

    pub fn integrations(&self) -> &IntegrationManager<P> {
        &self.inner.integrations
    }

    pub fn card(&self) -> &CardWorkflow<P> {
        &self.inner.card
    }

    pub fn checkout(&self) -> &CheckoutService<P> {
        &self.inner.checkout
    }
}
