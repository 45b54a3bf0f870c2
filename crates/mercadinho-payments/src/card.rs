//! # Card-Terminal Payment Workflow
//!
//! Sends the order total to a Mercado Pago Point terminal and follows the
//! payment intent until the customer finishes at the machine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Idle ─► LoadingDevices ─► CreatingIntent ─► Pending ─► Processing      │
//! │               │                  │              │            │          │
//! │               ▼                  ▼              ▼            ▼          │
//! │            Failed             Failed     Approved | Rejected | Cancelled│
//! │                                                                         │
//! │  Polling: poll_interval_ms (2s) × poll_max_attempts (60).               │
//! │  Transport errors use up attempts. Running out is a Timeout and the     │
//! │  intent is left open at the terminal. Closing the checkout while the    │
//! │  intent is open cancels it there (DELETE).                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use mercadinho_core::{Order, PaymentStatus, TransactionKind};
use mercadinho_db::Database;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::config::CardSettings;
use crate::credentials::PointCredentials;
use crate::error::{PaymentError, PaymentResult};
use crate::observer::WorkflowObserver;
use crate::pix::order_description;
use crate::poller::{poll_until, CancelToken, PollOutcome, Probe};
use crate::provider::{CardIntent, CardIntentRequest, DeviceStatus, IntentStatus, PaymentProvider, PointDevice};

/// Where a card attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CardState {
    Idle,
    LoadingDevices,
    CreatingIntent {
        device_id: String,
    },
    Pending {
        intent_id: String,
        device_id: String,
    },
    Processing {
        intent_id: String,
        device_id: String,
    },
    Approved {
        intent_id: String,
        payment_id: String,
    },
    Rejected {
        intent_id: String,
        message: String,
    },
    Cancelled {
        intent_id: Option<String>,
    },
    Failed {
        message: String,
        retryable: bool,
    },
}

/// How a card attempt ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Approved { intent_id: String, payment_id: String },
    Rejected { intent_id: String },
    Cancelled { intent_id: Option<String> },
}

/// Picks the configured terminal if it is online, else the first online one.
pub fn preferred_device<'a>(devices: &'a [PointDevice], configured: &str) -> Option<&'a PointDevice> {
    devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Online)
        .find(|d| d.id == configured)
        .or_else(|| devices.iter().find(|d| d.status == DeviceStatus::Online))
}

pub struct CardWorkflow<P> {
    provider: Arc<P>,
    db: Database,
    settings: CardSettings,
}

impl<P: PaymentProvider> CardWorkflow<P> {
    pub fn new(provider: Arc<P>, db: Database, settings: CardSettings) -> Self {
        CardWorkflow {
            provider,
            db,
            settings,
        }
    }

    /// Terminals that can take a payment right now.
    pub async fn load_devices(&self, credentials: &PointCredentials) -> PaymentResult<Vec<PointDevice>> {
        let devices: Vec<PointDevice> = self
            .provider
            .list_devices(&credentials.access_token)
            .await?
            .into_iter()
            .filter(|d| d.status == DeviceStatus::Online)
            .collect();

        debug!(online = devices.len(), "Point devices loaded");

        if devices.is_empty() {
            return Err(PaymentError::NoDevicesOnline);
        }
        Ok(devices)
    }

    /// Switches a terminal to integrated (PDV) mode.
    pub async fn activate_device(&self, credentials: &PointCredentials, device_id: &str) -> PaymentResult<()> {
        self.provider
            .activate_device(&credentials.access_token, device_id)
            .await?;
        info!(device_id = %device_id, "Point device switched to PDV mode");
        Ok(())
    }

    /// Cancels an intent at the terminal. Failures are only logged.
    pub async fn cancel_intent_quietly(&self, access_token: &str, device_id: &str, intent_id: &str) {
        match self
            .provider
            .cancel_card_intent(access_token, device_id, intent_id)
            .await
        {
            Ok(()) => {
                info!(intent_id = %intent_id, device_id = %device_id, "Payment intent cancelled");
                self.update_transaction(intent_id, IntentStatus::Cancelled).await;
            }
            Err(e) => {
                warn!(intent_id = %intent_id, device_id = %device_id, error = %e, "Failed to cancel payment intent");
            }
        }
    }

    /// Charges `order` on a terminal.
    ///
    /// Without `device_id` the terminals are listed and
    /// [`preferred_device`] picks one. Cancellation while the intent is
    /// open cancels it at the terminal.
    pub async fn run(
        &self,
        order: &Order,
        credentials: &PointCredentials,
        device_id: Option<&str>,
        cancel: &mut CancelToken,
        observer: &dyn WorkflowObserver,
    ) -> PaymentResult<CardOutcome> {
        let device_id = match device_id {
            Some(id) => id.to_string(),
            None => {
                observer.on_card(&CardState::LoadingDevices);
                let chosen = self.load_devices(credentials).await.and_then(|devices| {
                    preferred_device(&devices, &credentials.device_id)
                        .map(|d| d.id.clone())
                        .ok_or(PaymentError::NoDevicesOnline)
                });
                match chosen {
                    Ok(id) => id,
                    Err(e) => return Err(fail(observer, e)),
                }
            }
        };

        if cancel.is_cancelled() {
            observer.on_card(&CardState::Cancelled { intent_id: None });
            return Ok(CardOutcome::Cancelled { intent_id: None });
        }

        observer.on_card(&CardState::CreatingIntent {
            device_id: device_id.clone(),
        });

        let request = CardIntentRequest {
            amount: order.total(),
            description: order_description(order),
            device_id: device_id.clone(),
            external_reference: order.id.clone(),
        };
        let idempotency_key = Uuid::new_v4().to_string();

        let intent = match self
            .provider
            .create_card_intent(&credentials.access_token, &request, &idempotency_key)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                warn!(order_id = %order.id, device_id = %device_id, error = %e, "Payment intent creation failed");
                return Err(fail(observer, e));
            }
        };

        let intent_id = intent.id.clone();
        info!(order_id = %order.id, intent_id = %intent_id, device_id = %device_id, "Payment intent sent to terminal");
        self.record_intent(order, &intent).await;

        observer.on_card(&CardState::Pending {
            intent_id: intent_id.clone(),
            device_id: device_id.clone(),
        });

        let last_status = Mutex::new(IntentStatus::Pending);
        let provider = &self.provider;
        let access_token = credentials.access_token.as_str();
        let (intent_ref, device_ref, last_ref) = (intent_id.as_str(), device_id.as_str(), &last_status);

        let outcome = poll_until(self.settings.poll_policy(), cancel, |attempt| async move {
            let intent = provider.card_intent(access_token, intent_ref).await?;
            debug!(intent_id = %intent_ref, attempt, status = ?intent.status, "Payment intent status");

            if intent.status.is_terminal() {
                return Ok::<_, PaymentError>(Probe::Done(intent));
            }

            let changed = match last_ref.lock() {
                Ok(mut last) if *last != intent.status => {
                    *last = intent.status;
                    true
                }
                _ => false,
            };
            if changed {
                let state = match intent.status {
                    IntentStatus::Processing => CardState::Processing {
                        intent_id: intent_ref.to_string(),
                        device_id: device_ref.to_string(),
                    },
                    _ => CardState::Pending {
                        intent_id: intent_ref.to_string(),
                        device_id: device_ref.to_string(),
                    },
                };
                observer.on_card(&state);
            }
            Ok(Probe::Continue)
        })
        .await;

        match outcome {
            PollOutcome::Resolved { value: intent, attempts } => {
                self.settle(order, intent, attempts, observer).await
            }
            PollOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                warn!(
                    order_id = %order.id,
                    intent_id = %intent_id,
                    attempts,
                    last_error = ?last_error.map(|e| e.to_string()),
                    "Terminal did not finish the payment in time"
                );
                Err(fail(observer, PaymentError::Timeout { attempts }))
            }
            PollOutcome::Cancelled { attempts } => {
                info!(order_id = %order.id, intent_id = %intent_id, attempts, "Card attempt cancelled locally");
                self.cancel_intent_quietly(access_token, &device_id, &intent_id)
                    .await;
                observer.on_card(&CardState::Cancelled {
                    intent_id: Some(intent_id.clone()),
                });
                Ok(CardOutcome::Cancelled {
                    intent_id: Some(intent_id),
                })
            }
        }
    }

    async fn settle(
        &self,
        order: &Order,
        intent: CardIntent,
        attempts: u32,
        observer: &dyn WorkflowObserver,
    ) -> PaymentResult<CardOutcome> {
        self.update_transaction(&intent.id, intent.status).await;

        match intent.status {
            IntentStatus::Approved => {
                let payment_id = intent.payment_id.unwrap_or_else(|| intent.id.clone());
                info!(order_id = %order.id, intent_id = %intent.id, payment_id = %payment_id, attempts, "Card payment approved");

                if let Err(e) = self
                    .db
                    .orders()
                    .mark_payment_status(&order.id, PaymentStatus::Approved, Some(&payment_id))
                    .await
                {
                    error!(order_id = %order.id, error = %e, "Failed to mark order approved");
                    return Err(fail(observer, e.into()));
                }

                observer.on_card(&CardState::Approved {
                    intent_id: intent.id.clone(),
                    payment_id: payment_id.clone(),
                });
                Ok(CardOutcome::Approved {
                    intent_id: intent.id,
                    payment_id,
                })
            }
            IntentStatus::Rejected => {
                info!(order_id = %order.id, intent_id = %intent.id, "Card payment rejected");
                observer.on_card(&CardState::Rejected {
                    intent_id: intent.id.clone(),
                    message: PaymentError::Rejected {
                        message: String::new(),
                    }
                    .user_message(),
                });
                Ok(CardOutcome::Rejected { intent_id: intent.id })
            }
            _ => {
                info!(order_id = %order.id, intent_id = %intent.id, "Payment intent cancelled at the terminal");
                observer.on_card(&CardState::Cancelled {
                    intent_id: Some(intent.id.clone()),
                });
                Ok(CardOutcome::Cancelled {
                    intent_id: Some(intent.id),
                })
            }
        }
    }

    async fn record_intent(&self, order: &Order, intent: &CardIntent) {
        if let Err(e) = self
            .db
            .transactions()
            .record(
                &order.id,
                TransactionKind::Point,
                &intent.id,
                intent.status.as_str(),
                order.total_cents,
            )
            .await
        {
            error!(order_id = %order.id, intent_id = %intent.id, error = %e, "Failed to record payment intent");
        }
    }

    async fn update_transaction(&self, intent_id: &str, status: IntentStatus) {
        if let Err(e) = self
            .db
            .transactions()
            .update_status(TransactionKind::Point, intent_id, status.as_str())
            .await
        {
            error!(intent_id = %intent_id, error = %e, "Failed to update payment intent");
        }
    }
}

fn fail(observer: &dyn WorkflowObserver, e: PaymentError) -> PaymentError {
    observer.on_card(&CardState::Failed {
        message: e.user_message(),
        retryable: e.is_retryable(),
    });
    e
}
