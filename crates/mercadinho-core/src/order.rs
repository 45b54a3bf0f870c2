//! # Order Draft
//!
//! Builds the pending order from the cart. Monetary fields are always
//! derived here from the frozen cart lines and the customer's discount;
//! a total asserted by the SPA is only ever compared, never trusted.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart ─────────┐                                                        │
//! │  Customer? ────┼──► OrderDraft::build() ← THIS MODULE                   │
//! │  Method + N× ──┘        │                                               │
//! │                         │  subtotal = Σ unit_price × qty                │
//! │                         │  discount = subtotal × customer rate          │
//! │                         │  total    = subtotal − discount               │
//! │                         ▼                                               │
//! │              OrderRepository::create()  (one SQLite transaction:       │
//! │                                          order + items + stock)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, Order, PaymentMethod, PaymentStatus};
use crate::validation::{validate_installments, validate_quantity};

/// A validated, not-yet-persisted order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDraft {
    pub id: String,
    pub customer_id: Option<String>,
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub installments: i64,
}

impl OrderDraft {
    /// Builds a draft from the cart.
    ///
    /// ## Errors
    /// - `EmptyCart` when there is nothing to buy
    /// - `Validation` for bad quantities or installment counts
    pub fn build(
        cart: &Cart,
        customer: Option<&Customer>,
        payment_method: PaymentMethod,
        installments: i64,
    ) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        for item in &cart.items {
            validate_quantity(item.quantity)?;
        }
        validate_installments(payment_method, installments)?;

        let subtotal = cart.subtotal();
        let discount = customer
            .map(|c| subtotal.percentage(c.discount_rate()))
            .unwrap_or_default();

        Ok(OrderDraft {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.map(|c| c.id.clone()),
            items: cart.items.clone(),
            subtotal,
            discount,
            total: subtotal - discount,
            payment_method,
            installments,
        })
    }

    /// Rejects a client-asserted total that differs from the computed one.
    pub fn verify_claimed_total(&self, claimed_cents: i64) -> CoreResult<()> {
        if claimed_cents != self.total.cents() {
            return Err(CoreError::TotalMismatch {
                claimed_cents,
                computed_cents: self.total.cents(),
            });
        }
        Ok(())
    }

    /// The order as it will be stored: `pending`, no provider id yet.
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: self.id,
            customer_id: self.customer_id,
            subtotal_cents: self.subtotal.cents(),
            discount_cents: self.discount.cents(),
            total_cents: self.total.cents(),
            payment_method: self.payment_method,
            installments: self.installments,
            payment_status: PaymentStatus::Pending,
            external_payment_id: None,
            created_at: now,
            updated_at: now,
            items: self.items,
        }
    }
}
