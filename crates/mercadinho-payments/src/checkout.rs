//! # Checkout Session
//!
//! The kiosk's application state as one explicit value, plus the service
//! that runs every storefront operation against it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CheckoutService                                  │
//! │                                                                         │
//! │  cart ops ──────┐                                                       │
//! │  identify ──────┤        watch::Sender<CheckoutSession>                 │
//! │  open_order ────┼──────► { cart, customer, order, payment,  ──► HTTP /  │
//! │  pay_with_pix ──┤          rejection_seen }                    SPA poll │
//! │  pay_with_card ─┤                 ▲                                     │
//! │  close ─────────┘                 │ SessionObserver                     │
//! │                                   │                                     │
//! │                    spawned task: PixWorkflow / CardWorkflow             │
//! │                    (one at a time, CancelHandle kept here)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! 1. Cart is edited freely while no order is pending.
//! 2. `open_order` checks the method is available and persists a pending
//!    order (stock is taken in the same transaction).
//! 3. `pay_with_pix` / `pay_with_card` spawn one payment task. Retrying
//!    after a rejection, expiry or timeout reuses the same pending order.
//! 4. Approval marks the order approved and empties the cart.
//! 5. `close` stops any running task, cancels an open card intent, marks
//!    the order rejected if the provider ever rejected it, and resets the
//!    payment part of the session. The cart survives.

use std::sync::Arc;

use mercadinho_core::{Cart, CartTotals, CoreError, Customer, Order, OrderDraft, PaymentMethod, PaymentStatus};
use mercadinho_db::Database;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::card::{CardOutcome, CardState, CardWorkflow};
use crate::credentials::IntegrationManager;
use crate::error::{PaymentError, PaymentResult};
use crate::observer::WorkflowObserver;
use crate::pix::{PixOutcome, PixState, PixWorkflow};
use crate::poller::{cancel_pair, CancelHandle};
use crate::provider::{PaymentProvider, PointDevice};

// =============================================================================
// Session State
// =============================================================================

/// The payment attempt currently shown to the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "method", content = "status", rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Idle,
    Pix(PixState),
    Card(CardState),
}

/// A card intent that may still be open at the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenIntent {
    intent_id: String,
    device_id: String,
}

/// Everything the storefront shows during one visit.
#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export)]
pub struct CheckoutSession {
    pub cart: Cart,
    pub totals: CartTotals,
    pub customer: Option<Customer>,
    pub order: Option<Order>,
    pub payment: PaymentState,
    /// The provider rejected at least one attempt for the current order.
    pub rejection_seen: bool,
    #[serde(skip)]
    #[ts(skip)]
    open_intent: Option<OpenIntent>,
}

impl CheckoutSession {
    /// The current order, if it still waits for payment.
    pub fn pending_order(&self) -> Option<&Order> {
        self.order.as_ref().filter(|o| o.is_pending())
    }

    fn ensure_editable(&self) -> PaymentResult<()> {
        if self.pending_order().is_some() {
            return Err(PaymentError::CheckoutBusy);
        }
        Ok(())
    }

    fn refresh_totals(&mut self) {
        self.totals = CartTotals::from(&self.cart);
    }

    fn record_approval(&mut self, payment_id: &str) {
        self.cart.clear();
        self.refresh_totals();
        if let Some(order) = self.order.as_mut() {
            order.payment_status = PaymentStatus::Approved;
            order.external_payment_id = Some(payment_id.to_string());
        }
    }
}

/// Forwards workflow states into the session channel.
struct SessionObserver {
    state: Arc<watch::Sender<CheckoutSession>>,
}

impl WorkflowObserver for SessionObserver {
    fn on_pix(&self, pix: &PixState) {
        self.state.send_modify(|session| {
            if matches!(pix, PixState::Rejected { .. }) {
                session.rejection_seen = true;
            }
            session.payment = PaymentState::Pix(pix.clone());
        });
    }

    fn on_card(&self, card: &CardState) {
        self.state.send_modify(|session| {
            match card {
                CardState::Pending {
                    intent_id,
                    device_id,
                }
                | CardState::Processing {
                    intent_id,
                    device_id,
                } => {
                    session.open_intent = Some(OpenIntent {
                        intent_id: intent_id.clone(),
                        device_id: device_id.clone(),
                    });
                }
                CardState::Approved { .. } | CardState::Cancelled { .. } => {
                    session.open_intent = None;
                }
                CardState::Rejected { .. } => {
                    session.open_intent = None;
                    session.rejection_seen = true;
                }
                _ => {}
            }
            session.payment = PaymentState::Card(card.clone());
        });
    }
}

struct PaymentTask {
    cancel: CancelHandle,
    handle: JoinHandle<()>,
}

impl PaymentTask {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

// =============================================================================
// Checkout Service
// =============================================================================

/// Runs the storefront's checkout against one [`CheckoutSession`].
pub struct CheckoutService<P> {
    db: Database,
    integrations: Arc<IntegrationManager<P>>,
    pix: Arc<PixWorkflow<P>>,
    card: Arc<CardWorkflow<P>>,
    payer_email_fallback: String,
    state: Arc<watch::Sender<CheckoutSession>>,
    task: Mutex<Option<PaymentTask>>,
}

impl<P: PaymentProvider> CheckoutService<P> {
    pub fn new(
        db: Database,
        integrations: Arc<IntegrationManager<P>>,
        pix: Arc<PixWorkflow<P>>,
        card: Arc<CardWorkflow<P>>,
        payer_email_fallback: impl Into<String>,
    ) -> Self {
        let (tx, _rx) = watch::channel(CheckoutSession::default());
        CheckoutService {
            db,
            integrations,
            pix,
            card,
            payer_email_fallback: payer_email_fallback.into(),
            state: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    /// Receives every session change.
    pub fn subscribe(&self) -> watch::Receiver<CheckoutSession> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CheckoutSession {
        self.state.borrow().clone()
    }

    /// Applies `change` atomically; nothing is published when it fails.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut CheckoutSession) -> PaymentResult<T>,
    ) -> PaymentResult<T> {
        let mut outcome = None;
        self.state.send_if_modified(|session| {
            let mut next = session.clone();
            let result = change(&mut next);
            let applied = result.is_ok();
            if applied {
                *session = next;
            }
            outcome = Some(result);
            applied
        });
        outcome.unwrap_or(Err(PaymentError::CheckoutBusy))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub async fn add_item(&self, product_id: &str, quantity: i64) -> PaymentResult<CheckoutSession> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        self.modify(|session| {
            session.ensure_editable()?;
            session.cart.add_item(&product, quantity)?;
            session.refresh_totals();
            Ok(session.clone())
        })
    }

    pub fn update_quantity(&self, product_id: &str, quantity: i64) -> PaymentResult<CheckoutSession> {
        self.modify(|session| {
            session.ensure_editable()?;
            session.cart.update_quantity(product_id, quantity)?;
            session.refresh_totals();
            Ok(session.clone())
        })
    }

    pub fn remove_item(&self, product_id: &str) -> PaymentResult<CheckoutSession> {
        self.modify(|session| {
            session.ensure_editable()?;
            session.cart.remove_item(product_id)?;
            session.refresh_totals();
            Ok(session.clone())
        })
    }

    pub fn clear_cart(&self) -> PaymentResult<CheckoutSession> {
        self.modify(|session| {
            session.ensure_editable()?;
            session.cart.clear();
            session.refresh_totals();
            Ok(session.clone())
        })
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Looks the customer up by phone and attaches them to the session.
    /// Returns `None` when nobody has that phone.
    pub async fn identify_customer(&self, phone: &str) -> PaymentResult<Option<Customer>> {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        let Some(customer) = self.db.customers().find_by_phone(&digits).await? else {
            debug!("No customer for phone");
            return Ok(None);
        };

        self.modify(|session| {
            session.ensure_editable()?;
            session.customer = Some(customer.clone());
            Ok(())
        })?;
        info!(customer_id = %customer.id, "Customer identified");
        Ok(Some(customer))
    }

    pub fn forget_customer(&self) -> PaymentResult<()> {
        self.modify(|session| {
            session.ensure_editable()?;
            session.customer = None;
            Ok(())
        })
    }

    // =========================================================================
    // Order
    // =========================================================================

    /// Derived from the integrations on every call.
    pub async fn available_payment_methods(&self) -> Vec<PaymentMethod> {
        self.integrations.available_payment_methods().await
    }

    /// Persists a pending order for the cart, paid with `method`.
    ///
    /// Re-opening with the same method and installments returns the order
    /// already pending. `claimed_total_cents`, when given, must match the
    /// recomputed total.
    pub async fn open_order(
        &self,
        method: PaymentMethod,
        installments: i64,
        claimed_total_cents: Option<i64>,
    ) -> PaymentResult<Order> {
        if !self.available_payment_methods().await.contains(&method) {
            warn!(method = %method, "Payment method not available");
            return Err(PaymentError::MethodUnavailable { method });
        }

        let task = self.task.lock().await;
        if task.as_ref().is_some_and(PaymentTask::is_running) {
            return Err(PaymentError::CheckoutBusy);
        }

        let session = self.snapshot();
        if let Some(order) = session.pending_order() {
            if order.payment_method == method && order.installments == installments {
                return Ok(order.clone());
            }
            return Err(PaymentError::MethodMismatch {
                order: order.payment_method,
                requested: method,
            });
        }

        let draft = OrderDraft::build(&session.cart, session.customer.as_ref(), method, installments)?;
        if let Some(claimed) = claimed_total_cents {
            draft.verify_claimed_total(claimed)?;
        }

        let order = self.db.orders().create(&draft).await?;
        info!(
            order_id = %order.id,
            method = %method,
            total_cents = order.total_cents,
            "Order opened"
        );

        let opened = order.clone();
        self.state.send_modify(|s| {
            s.order = Some(opened);
            s.payment = PaymentState::Idle;
            s.rejection_seen = false;
        });
        drop(task);
        Ok(order)
    }

    fn pending_order_for(&self, requested: PaymentMethod) -> PaymentResult<Order> {
        let session = self.snapshot();
        let order = session.pending_order().ok_or(PaymentError::NoOpenOrder)?;
        let matches = if requested.is_card() {
            order.payment_method.is_card()
        } else {
            order.payment_method == requested
        };
        if !matches {
            return Err(PaymentError::MethodMismatch {
                order: order.payment_method,
                requested,
            });
        }
        Ok(order.clone())
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Starts a PIX attempt for the pending order in the background.
    ///
    /// Progress (QR code, countdown, outcome) arrives through
    /// [`Self::subscribe`].
    pub async fn pay_with_pix(&self, payer_email: Option<String>) -> PaymentResult<()> {
        let credentials = self.integrations.checkout_credentials().await?;

        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(PaymentTask::is_running) {
            return Err(PaymentError::CheckoutBusy);
        }
        let order = self.pending_order_for(PaymentMethod::Pix)?;

        let payer_email = payer_email
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.snapshot().customer.and_then(|c| c.email))
            .unwrap_or_else(|| self.payer_email_fallback.clone());

        let (cancel, mut token) = cancel_pair();
        let workflow = self.pix.clone();
        let state = self.state.clone();
        let observer = SessionObserver {
            state: state.clone(),
        };

        info!(order_id = %order.id, "Starting PIX payment");
        let handle = tokio::spawn(async move {
            match workflow
                .run(&order, &credentials, &payer_email, &mut token, &observer)
                .await
            {
                Ok(PixOutcome::Approved { payment_id }) => {
                    state.send_modify(|s| s.record_approval(&payment_id));
                    info!(order_id = %order.id, "Checkout paid with PIX");
                }
                Ok(outcome) => debug!(order_id = %order.id, ?outcome, "PIX attempt ended"),
                Err(e) => warn!(order_id = %order.id, error = %e, "PIX attempt failed"),
            }
        });

        *task = Some(PaymentTask { cancel, handle });
        Ok(())
    }

    /// Online terminals for the device picker.
    pub async fn list_online_devices(&self) -> PaymentResult<Vec<PointDevice>> {
        let credentials = self.integrations.point_credentials().await?;
        self.card.load_devices(&credentials).await
    }

    /// Starts a card attempt for the pending order in the background.
    ///
    /// A previous intent still open at a terminal is cancelled first.
    pub async fn pay_with_card(&self, device_id: Option<String>) -> PaymentResult<()> {
        let credentials = self.integrations.point_credentials().await?;

        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(PaymentTask::is_running) {
            return Err(PaymentError::CheckoutBusy);
        }
        let order = self.pending_order_for(PaymentMethod::Credit)?;

        if let Some(stale) = self.take_open_intent() {
            info!(intent_id = %stale.intent_id, "Cancelling previous payment intent before retry");
            self.card
                .cancel_intent_quietly(&credentials.access_token, &stale.device_id, &stale.intent_id)
                .await;
        }

        let device_id = device_id.filter(|d| !d.trim().is_empty());
        let (cancel, mut token) = cancel_pair();
        let workflow = self.card.clone();
        let state = self.state.clone();
        let observer = SessionObserver {
            state: state.clone(),
        };

        info!(order_id = %order.id, device_id = ?device_id, "Starting card payment");
        let handle = tokio::spawn(async move {
            match workflow
                .run(&order, &credentials, device_id.as_deref(), &mut token, &observer)
                .await
            {
                Ok(CardOutcome::Approved { payment_id, .. }) => {
                    state.send_modify(|s| s.record_approval(&payment_id));
                    info!(order_id = %order.id, "Checkout paid by card");
                }
                Ok(outcome) => debug!(order_id = %order.id, ?outcome, "Card attempt ended"),
                Err(e) => warn!(order_id = %order.id, error = %e, "Card attempt failed"),
            }
        });

        *task = Some(PaymentTask { cancel, handle });
        Ok(())
    }

    /// Waits for the running payment task, if any, to finish on its own.
    pub async fn wait_for_payment(&self) {
        let mut task = self.task.lock().await;
        if let Some(running) = task.take() {
            if let Err(e) = running.handle.await {
                warn!(error = %e, "Payment task ended abnormally");
            }
        }
    }

    fn take_open_intent(&self) -> Option<OpenIntent> {
        let mut taken = None;
        self.state.send_if_modified(|s| {
            taken = s.open_intent.take();
            taken.is_some()
        });
        taken
    }

    /// Closes the payment modal.
    ///
    /// Waits for the running task to stop, cancels an intent left open
    /// at a terminal, and marks a pending order `rejected` if the provider
    /// rejected any attempt. Cart and customer are kept.
    pub async fn close(&self) -> PaymentResult<()> {
        let mut task = self.task.lock().await;
        if let Some(running) = task.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                warn!(error = %e, "Payment task ended abnormally");
            }
        }

        // Only an intent still pending or processing is cancelled at the terminal.
        let live = matches!(
            self.snapshot().payment,
            PaymentState::Card(CardState::Pending { .. } | CardState::Processing { .. })
        );
        match self.take_open_intent() {
            Some(stale) if !live => {
                debug!(intent_id = %stale.intent_id, "Payment intent no longer live, not cancelling");
            }
            Some(stale) => match self.integrations.point_credentials().await {
                Ok(credentials) => {
                    self.card
                        .cancel_intent_quietly(&credentials.access_token, &stale.device_id, &stale.intent_id)
                        .await;
                }
                Err(e) => warn!(intent_id = %stale.intent_id, error = %e, "Cannot cancel payment intent"),
            },
            None => {}
        }

        let session = self.snapshot();
        let marked = match session.pending_order() {
            Some(order) if session.rejection_seen => {
                info!(order_id = %order.id, "Closing rejected order");
                self.db
                    .orders()
                    .mark_payment_status(&order.id, PaymentStatus::Rejected, None)
                    .await
            }
            _ => Ok(()),
        };

        self.state.send_modify(|s| {
            s.order = None;
            s.payment = PaymentState::Idle;
            s.rejection_seen = false;
            s.open_intent = None;
        });
        drop(task);

        marked.map_err(PaymentError::from)
    }
}
