//! # PIX Payment Workflow
//!
//! One attempt at collecting a PIX payment for a pending order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Idle ──► Creating ──► AwaitingPayment ──┬──► Approved                  │
//! │             │          (QR + countdown)  ├──► Rejected                  │
//! │             │                            ├──► Expired  (countdown = 0)  │
//! │             └──► Failed                  └──► Failed   (poll budget)    │
//! │                                                                         │
//! │  AwaitingPayment races two arms:                                        │
//! │    status poll   every poll_interval, at most poll_max_attempts         │
//! │    countdown     one tick per second from expiration_secs to 0          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Closing the checkout only stops the local task. PIX charges are never
//! cancelled at the provider; they expire there on their own.
//! A retry is simply another [`PixWorkflow::run`] with a fresh
//! idempotency key and a full countdown.

use std::sync::Arc;
use std::time::Duration;

use mercadinho_core::{Order, PaymentStatus, TransactionKind};
use mercadinho_db::Database;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::config::PixSettings;
use crate::credentials::CheckoutCredentials;
use crate::error::{PaymentError, PaymentResult};
use crate::observer::WorkflowObserver;
use crate::poller::{poll_until, CancelToken, PollOutcome, Probe};
use crate::provider::{PaymentProvider, PixChargeRequest, PixStatus};

/// Where a PIX attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PixState {
    Idle,
    Creating,
    AwaitingPayment {
        payment_id: String,
        qr_code: String,
        qr_code_base64: String,
        remaining_secs: u64,
    },
    Approved {
        payment_id: String,
    },
    Rejected {
        payment_id: String,
        message: String,
    },
    Expired {
        payment_id: String,
    },
    Failed {
        message: String,
        retryable: bool,
    },
}

/// How a PIX attempt ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixOutcome {
    Approved { payment_id: String },
    Rejected { payment_id: String },
    Expired { payment_id: String },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Approved,
    Rejected,
}

enum Race {
    Cancelled,
    Polled(PollOutcome<Settled, PaymentError>),
    CountdownOver,
}

pub struct PixWorkflow<P> {
    provider: Arc<P>,
    db: Database,
    settings: PixSettings,
}

impl<P: PaymentProvider> PixWorkflow<P> {
    pub fn new(provider: Arc<P>, db: Database, settings: PixSettings) -> Self {
        PixWorkflow {
            provider,
            db,
            settings,
        }
    }

    /// Creates a charge for `order` and waits for it to settle, expire or
    /// be cancelled.
    ///
    /// On approval the order is marked approved with the provider payment
    /// id. Rejection and expiry leave it pending so the customer can retry.
    pub async fn run(
        &self,
        order: &Order,
        credentials: &CheckoutCredentials,
        payer_email: &str,
        cancel: &mut CancelToken,
        observer: &dyn WorkflowObserver,
    ) -> PaymentResult<PixOutcome> {
        observer.on_pix(&PixState::Creating);

        let request = PixChargeRequest {
            amount: order.total(),
            description: order_description(order),
            payer_email: payer_email.to_string(),
            external_reference: order.id.clone(),
        };
        let idempotency_key = Uuid::new_v4().to_string();

        let charge = match self
            .provider
            .create_pix_charge(&credentials.access_token, &request, &idempotency_key)
            .await
        {
            Ok(charge) => charge,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "PIX charge creation failed");
                observer.on_pix(&failed(&e));
                return Err(e);
            }
        };

        let payment_id = charge.payment_id.clone();
        info!(order_id = %order.id, payment_id = %payment_id, "PIX charge created");
        self.record_charge(order, &payment_id, charge.status).await;

        if cancel.is_cancelled() {
            observer.on_pix(&PixState::Idle);
            return Ok(PixOutcome::Cancelled);
        }

        let total_secs = self.settings.expiration().as_secs();
        let awaiting = |remaining_secs: u64| PixState::AwaitingPayment {
            payment_id: payment_id.clone(),
            qr_code: charge.qr_code.clone(),
            qr_code_base64: charge.qr_code_base64.clone(),
            remaining_secs,
        };
        observer.on_pix(&awaiting(total_secs));

        let started = Instant::now();
        let deadline = started + self.settings.expiration();

        // Both arms are dropped before anything is written back.
        let race = {
            let mut poll_cancel = cancel.clone();
            let provider = &self.provider;
            let access_token = credentials.access_token.as_str();
            let charge_id = payment_id.as_str();
            let poll = poll_until(self.settings.poll_policy(), &mut poll_cancel, |attempt| async move {
                debug!(payment_id = %charge_id, attempt, "Checking PIX status");
                let status = provider.pix_status(access_token, charge_id).await?;
                Ok::<_, PaymentError>(match status {
                    PixStatus::Pending => Probe::Continue,
                    PixStatus::Approved => Probe::Done(Settled::Approved),
                    PixStatus::Rejected => Probe::Done(Settled::Rejected),
                })
            });
            tokio::pin!(poll);

            let countdown = async {
                for elapsed in 1..=total_secs {
                    tokio::time::sleep_until(started + Duration::from_secs(elapsed)).await;
                    observer.on_pix(&awaiting(total_secs - elapsed));
                }
            };
            tokio::pin!(countdown);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Race::Cancelled,
                outcome = &mut poll => Race::Polled(outcome),
                _ = &mut countdown => Race::CountdownOver,
            }
        };

        match race {
            Race::Cancelled | Race::Polled(PollOutcome::Cancelled { .. }) => {
                info!(order_id = %order.id, payment_id = %payment_id, "PIX attempt cancelled locally");
                observer.on_pix(&PixState::Idle);
                Ok(PixOutcome::Cancelled)
            }
            Race::CountdownOver => Ok(self.expire(order, payment_id, observer).await),
            Race::Polled(PollOutcome::Resolved {
                value: Settled::Approved,
                attempts,
            }) => {
                info!(order_id = %order.id, payment_id = %payment_id, attempts, "PIX payment approved");
                self.update_transaction(&payment_id, PixStatus::Approved.as_str())
                    .await;

                if let Err(e) = self
                    .db
                    .orders()
                    .mark_payment_status(&order.id, PaymentStatus::Approved, Some(&payment_id))
                    .await
                {
                    error!(order_id = %order.id, error = %e, "Failed to mark order approved");
                    let e = PaymentError::from(e);
                    observer.on_pix(&failed(&e));
                    return Err(e);
                }

                observer.on_pix(&PixState::Approved {
                    payment_id: payment_id.clone(),
                });
                Ok(PixOutcome::Approved { payment_id })
            }
            Race::Polled(PollOutcome::Resolved {
                value: Settled::Rejected,
                ..
            }) => {
                info!(order_id = %order.id, payment_id = %payment_id, "PIX payment rejected");
                self.update_transaction(&payment_id, PixStatus::Rejected.as_str())
                    .await;
                observer.on_pix(&PixState::Rejected {
                    payment_id: payment_id.clone(),
                    message: PaymentError::Rejected {
                        message: String::new(),
                    }
                    .user_message(),
                });
                Ok(PixOutcome::Rejected { payment_id })
            }
            Race::Polled(PollOutcome::Exhausted {
                attempts,
                last_error,
            }) => {
                if Instant::now() >= deadline {
                    return Ok(self.expire(order, payment_id, observer).await);
                }
                warn!(
                    order_id = %order.id,
                    payment_id = %payment_id,
                    attempts,
                    last_error = ?last_error.map(|e| e.to_string()),
                    "PIX status polling gave up"
                );
                let e = PaymentError::Timeout { attempts };
                observer.on_pix(&failed(&e));
                Err(e)
            }
        }
    }

    async fn expire(
        &self,
        order: &Order,
        payment_id: String,
        observer: &dyn WorkflowObserver,
    ) -> PixOutcome {
        info!(order_id = %order.id, payment_id = %payment_id, "PIX charge expired");
        self.update_transaction(&payment_id, "expired").await;
        observer.on_pix(&PixState::Expired {
            payment_id: payment_id.clone(),
        });
        PixOutcome::Expired { payment_id }
    }

    async fn record_charge(&self, order: &Order, payment_id: &str, status: PixStatus) {
        if let Err(e) = self
            .db
            .transactions()
            .record(
                &order.id,
                TransactionKind::Pix,
                payment_id,
                status.as_str(),
                order.total_cents,
            )
            .await
        {
            error!(order_id = %order.id, payment_id = %payment_id, error = %e, "Failed to record PIX charge");
        }

        if let Err(e) = self
            .db
            .orders()
            .set_external_payment_id(&order.id, payment_id)
            .await
        {
            error!(order_id = %order.id, payment_id = %payment_id, error = %e, "Failed to store PIX payment id");
        }
    }

    async fn update_transaction(&self, payment_id: &str, status: &str) {
        if let Err(e) = self
            .db
            .transactions()
            .update_status(TransactionKind::Pix, payment_id, status)
            .await
        {
            error!(payment_id = %payment_id, error = %e, "Failed to update PIX transaction");
        }
    }
}

fn failed(e: &PaymentError) -> PixState {
    PixState::Failed {
        message: e.user_message(),
        retryable: e.is_retryable(),
    }
}

pub(crate) fn order_description(order: &Order) -> String {
    let short: String = order.id.chars().take(8).collect();
    format!("Mercadinho - Pedido {short}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::tests::checkout;
    use crate::observer::RecordingObserver;
    use crate::poller::cancel_pair;
    use crate::testing::FakeProvider;
    use mercadinho_core::{Cart, OrderDraft, PaymentMethod, Product};
    use mercadinho_db::DbConfig;

    async fn pending_order(db: &Database) -> Order {
        let mut cart = Cart::new();
        for (name, price) in [("Pão de queijo", 450), ("Café", 200)] {
            let product = Product {
                id: Uuid::new_v4().to_string(),
                category_id: None,
                name: name.to_string(),
                barcode: None,
                image_url: None,
                price_cents: price,
                cost_cents: price / 2,
                stock: 10,
                is_active: true,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            };
            db.products().insert(&product).await.unwrap();
            cart.add_item(&product, 1).unwrap();
        }
        let draft = OrderDraft::build(&cart, None, PaymentMethod::Pix, 1).unwrap();
        db.orders().create(&draft).await.unwrap()
    }

    // Real clock with a 10ms poll; the countdown stays at the default 300s.
    fn fast_settings() -> PixSettings {
        PixSettings {
            poll_interval_ms: 10,
            ..PixSettings::default()
        }
    }

    async fn setup_with(
        provider: FakeProvider,
        settings: PixSettings,
    ) -> (PixWorkflow<FakeProvider>, Arc<FakeProvider>, Database, Order) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = pending_order(&db).await;
        let provider = Arc::new(provider);
        let workflow = PixWorkflow::new(provider.clone(), db.clone(), settings);
        (workflow, provider, db, order)
    }

    async fn setup(provider: FakeProvider) -> (PixWorkflow<FakeProvider>, Arc<FakeProvider>, Database, Order) {
        setup_with(provider, fast_settings()).await
    }

    #[tokio::test]
    async fn test_approved_marks_order() {
        let provider = FakeProvider::default();
        provider.push_pix_statuses([PixStatus::Pending, PixStatus::Approved]);
        let (workflow, provider, db, order) = setup(provider).await;
        let observer = RecordingObserver::default();
        let (_handle, mut token) = cancel_pair();

        let outcome = workflow
            .run(&order, &checkout(true), "cliente@mercadinho.local", &mut token, &observer)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PixOutcome::Approved {
                payment_id: "pix-1".into()
            }
        );
        assert_eq!(provider.pix_status_calls(), 2);

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Approved);
        assert_eq!(stored.external_payment_id.as_deref(), Some("pix-1"));

        let (request, key) = &provider.pix_requests()[0];
        assert_eq!(request.amount.cents(), 650);
        assert_eq!(request.external_reference, order.id);
        assert!(Uuid::parse_str(key).is_ok());

        let states = observer.pix_states();
        assert_eq!(states.first(), Some(&PixState::Creating));
        assert_eq!(
            states.last(),
            Some(&PixState::Approved {
                payment_id: "pix-1".into()
            })
        );

        let txs = db.transactions().list_for_order(&order.id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].status, "approved");
    }

    #[tokio::test]
    async fn test_expires_after_countdown() {
        let settings = PixSettings {
            expiration_secs: 2,
            poll_interval_ms: 10,
            poll_max_attempts: 1000,
        };
        let (workflow, provider, db, order) = setup_with(FakeProvider::default(), settings).await;
        let observer = RecordingObserver::default();
        let (_handle, mut token) = cancel_pair();
        let started = std::time::Instant::now();

        let outcome = workflow
            .run(&order, &checkout(true), "cliente@mercadinho.local", &mut token, &observer)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PixOutcome::Expired {
                payment_id: "pix-1".into()
            }
        );
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(provider.pix_status_calls() > 1);

        let remaining: Vec<u64> = observer
            .pix_states()
            .iter()
            .filter_map(|s| match s {
                PixState::AwaitingPayment { remaining_secs, .. } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert!(stored.is_pending());
    }

    #[tokio::test]
    async fn test_poll_budget_spent_before_expiry_is_timeout() {
        let settings = PixSettings {
            poll_max_attempts: 5,
            ..fast_settings()
        };
        let (workflow, provider, _db, order) = setup_with(FakeProvider::default(), settings).await;
        let (_handle, mut token) = cancel_pair();

        let err = workflow
            .run(&order, &checkout(true), "cliente@mercadinho.local", &mut token, &crate::observer::NoOpObserver)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Timeout { attempts: 5 }));
        assert_eq!(provider.pix_status_calls(), 5);
    }

    #[tokio::test]
    async fn test_rejected_keeps_order_pending() {
        let provider = FakeProvider::default();
        provider.push_pix_statuses([PixStatus::Rejected]);
        let (workflow, _provider, db, order) = setup(provider).await;
        let observer = RecordingObserver::default();
        let (_handle, mut token) = cancel_pair();

        let outcome = workflow
            .run(&order, &checkout(true), "cliente@mercadinho.local", &mut token, &observer)
            .await
            .unwrap();

        assert!(matches!(outcome, PixOutcome::Rejected { .. }));
        assert!(matches!(observer.pix_states().last(), Some(PixState::Rejected { .. })));
        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert!(stored.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_stops_polling() {
        let (workflow, provider, _db, order) = setup(FakeProvider::default()).await;
        let (handle, mut token) = cancel_pair();
        let workflow = Arc::new(workflow);
        let observer = Arc::new(RecordingObserver::default());

        let task = {
            let workflow = workflow.clone();
            let observer = observer.clone();
            tokio::spawn(async move {
                workflow
                    .run(&order, &checkout(true), "a@b.com", &mut token, &*observer)
                    .await
            })
        };

        while provider.pix_status_calls() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.cancel();
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(outcome, PixOutcome::Cancelled);
        assert!(provider.pix_status_calls() >= 2);
        assert!(provider.cancelled().is_empty());
        assert_eq!(observer.pix_states().last(), Some(&PixState::Idle));
    }
}
