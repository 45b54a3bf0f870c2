//! # Domain Types
//!
//! Core domain types shared by the storefront, the back-office and the
//! payment workflows.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  items (snap)   │   │  phone          │       │
//! │  │  cost_cents     │   │  total_cents    │   │  discount_bps   │       │
//! │  │  stock          │   │  payment_status │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PaymentMethod   │   │ PaymentStatus   │   │ ProviderTxn     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Pix            │   │  Pending ──┬──► │   │  pix | point    │       │
//! │  │  Credit         │   │  Approved ◄┤    │   │  provider_id    │       │
//! │  │  Debit          │   │  Rejected ◄┘    │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartItem;
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Rate};

// =============================================================================
// Product
// =============================================================================

/// A product on the store shelf.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub category_id: Option<String>,

    /// Display name shown on the storefront and on the order.
    pub name: String,

    /// EAN-13 barcode, when the product has one.
    pub barcode: Option<String>,

    pub image_url: Option<String>,

    /// Sale price in centavos.
    pub price_cents: i64,

    /// Purchase cost in centavos (margin and cash-flow cost of goods).
    pub cost_cents: i64,

    /// Units on the shelf. Never negative: decrements are conditional.
    pub stock: i64,

    /// Inactive products are hidden from the storefront (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks whether `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// An identified customer (stored in the `users` table).
///
/// Identification at checkout is optional; an identified customer gets
/// their loyalty discount applied to the order subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Loyalty discount in basis points (1000 = 10%).
    pub discount_bps: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Discount rate, clamped to 0..=100%.
    pub fn discount_rate(&self) -> Rate {
        Rate::from_bps(self.discount_bps.clamp(0, 10_000) as u32)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
///
/// `Pix` goes through the checkout integration (QR code); `Credit` and
/// `Debit` go through the Point card terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Credit,
    Debit,
}

impl PaymentMethod {
    /// All methods in storefront display order.
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::Pix, PaymentMethod::Credit, PaymentMethod::Debit];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
        }
    }

    /// True for methods paid on the card terminal.
    pub const fn is_card(&self) -> bool {
        matches!(self, PaymentMethod::Credit | PaymentMethod::Debit)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment status of an order.
///
/// ```text
///            ┌──────────► Approved
///  Pending ──┤
///            └──────────► Rejected
/// ```
/// Exactly one transition, never further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// One purchase transaction.
///
/// `items` are snapshots frozen when the order was created; later product
/// edits never reach them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    /// Always `subtotal_cents - discount_cents`.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub installments: i64,
    pub payment_status: PaymentStatus,
    /// Mercado Pago payment id once the provider has one.
    pub external_payment_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<CartItem>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    /// Checks that moving to `next` is a legal transition.
    pub fn ensure_can_transition(&self, next: PaymentStatus) -> CoreResult<()> {
        if self.payment_status.is_terminal() || !next.is_terminal() {
            return Err(CoreError::InvalidOrderTransition {
                order_id: self.id.clone(),
                current_status: self.payment_status.to_string(),
                requested: next.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Expense
// =============================================================================

/// An operating expense (rent, electricity, restocking freight, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub category: Option<String>,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub incurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Provider Transaction
// =============================================================================

/// Which Mercado Pago sub-API produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// `/v1/payments` PIX charge.
    Pix,
    /// `/point/integration-api` payment intent.
    Point,
}

/// A charge or intent created at the provider for an order
/// (`mp_transactions` table). Several may exist per order across retries.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProviderTransaction {
    pub id: String,
    pub order_id: String,
    pub provider_id: String,
    pub kind: TransactionKind,
    /// Last status seen, in the provider's vocabulary.
    pub status: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order() -> Order {
        Order {
            id: "order-1".to_string(),
            customer_id: None,
            subtotal_cents: 650,
            discount_cents: 0,
            total_cents: 650,
            payment_method: PaymentMethod::Pix,
            installments: 1,
            payment_status: PaymentStatus::Pending,
            external_payment_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: Vec::new(),
        }
    }

    #[test]
    fn test_order_transitions_once() {
        let mut order = pending_order();
        assert!(order.ensure_can_transition(PaymentStatus::Approved).is_ok());
        assert!(order.ensure_can_transition(PaymentStatus::Rejected).is_ok());
        assert!(order.ensure_can_transition(PaymentStatus::Pending).is_err());

        order.payment_status = PaymentStatus::Approved;
        let err = order
            .ensure_can_transition(PaymentStatus::Rejected)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOrderTransition { .. }));
    }

    #[test]
    fn test_payment_method_serde() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Pix).unwrap(), "\"pix\"");
        let m: PaymentMethod = serde_json::from_str("\"credit\"").unwrap();
        assert!(m.is_card());
        assert!(!PaymentMethod::Pix.is_card());
    }

    #[test]
    fn test_customer_discount_rate_is_clamped() {
        let mut customer = Customer {
            id: "c1".to_string(),
            name: "Dona Maria".to_string(),
            phone: Some("11999990000".to_string()),
            email: None,
            discount_bps: 500,
            created_at: Utc::now(),
        };
        assert_eq!(customer.discount_rate().bps(), 500);

        customer.discount_bps = 20_000;
        assert_eq!(customer.discount_rate().bps(), 10_000);
        customer.discount_bps = -5;
        assert_eq!(customer.discount_rate().bps(), 0);
    }
}
