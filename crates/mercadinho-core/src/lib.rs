//! # mercadinho-core: Pure Business Logic for Mercadinho
//!
//! Everything the self-service store computes without I/O lives here:
//! the cart, the order aggregate's totals, margins, payment fees and the
//! cash-flow rollups shown in the back-office.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Mercadinho Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront / Admin SPA                       │   │
//! │  │    Products ──► Cart ──► Checkout ──► PIX QR / Maquininha       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP (mercadinho-server)               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          mercadinho-payments (workflows, Mercado Pago)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ mercadinho-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │  order  │ │cashflow │  │   │
//! │  │   │ Product │ │  Money  │ │  Cart   │ │  Draft  │ │ Summary │  │   │
//! │  │   │  Order  │ │  Rate   │ │CartItem │ │ totals  │ │  daily  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐                          │   │
//! │  │   │ pricing │ │  fees   │ │validat. │                          │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘                          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mercadinho-db (SQLite repositories)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Customer, Expense, ...)
//! - [`money`] - Money in centavos and basis-point rates
//! - [`cart`] - The customer's cart with frozen price snapshots
//! - [`order`] - Order draft: totals recomputed from the cart
//! - [`pricing`] - Margin, sale price and profit
//! - [`fees`] - Payment processor fee table
//! - [`cashflow`] - Revenue/cost/expense/fee/profit rollups
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mercadinho_core::money::{Money, Rate};
//!
//! let subtotal = Money::from_cents(650); // R$ 6,50
//! let discount = subtotal.percentage(Rate::from_bps(1000)); // 10%
//! assert_eq!(discount.cents(), 65);
//! assert_eq!(subtotal.to_string(), "R$ 6,50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod cashflow;
pub mod error;
pub mod fees;
pub mod money;
pub mod order;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use fees::FeeTable;
pub use money::{Money, Rate};
pub use order::OrderDraft;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart.
///
/// Guards against typing 1000 instead of 10 on the kiosk keypad.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Credit card installments accepted by the terminal (1x to 10x).
pub const MAX_INSTALLMENTS: i64 = 10;
