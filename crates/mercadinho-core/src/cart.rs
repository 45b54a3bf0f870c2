//! # Cart
//!
//! The customer's cart. Each line freezes the product's name, image and
//! price at the moment it was added, so the order built from it is a
//! snapshot that later product edits cannot reach.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront Action        Operation              Cart Change            │
//! │  ─────────────────        ─────────              ───────────            │
//! │  Tap product ───────────► add_item() ──────────► push / qty += n        │
//! │  +/- buttons ───────────► update_quantity() ───► qty = n (0 removes)    │
//! │  Trash icon ────────────► remove_item() ───────► retain                 │
//! │  Payment approved ──────► clear() ─────────────► items.clear()          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// A cart line: product snapshot plus quantity (always ≥ 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    /// Name at time of adding (frozen).
    pub name: String,
    /// Image at time of adding (frozen).
    pub image_url: Option<String>,
    /// Price in centavos at time of adding (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl CartItem {
    /// Freezes `product` into a cart line.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            unit_price_cents: product.price_cents,
            quantity,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding again increases quantity)
/// - Quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds `quantity` of `product`, merging with an existing line.
    ///
    /// Stock is checked against the live product here for early feedback;
    /// the authoritative check is the conditional decrement at order time.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }

        let already = self
            .items
            .iter()
            .find(|i| i.product_id == product.id)
            .map(|i| i.quantity)
            .unwrap_or(0);
        let wanted = already + quantity;

        if wanted > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: wanted,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if !product.can_sell(wanted) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: wanted,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            item.quantity = wanted;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Sets the quantity of a line. Zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        validate_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == before {
            Err(CoreError::NotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals, before any customer discount.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal_cents: cart.subtotal().cents(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            category_id: None,
            name: format!("Produto {}", id),
            barcode: None,
            image_url: Some(format!("https://cdn.example/{}.png", id)),
            price_cents,
            cost_cents: price_cents / 2,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::new();
        let p = product("1", 450, 10);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal().cents(), 2250);
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut cart = Cart::new();
        let mut p = product("1", 450, 10);
        cart.add_item(&p, 1).unwrap();

        p.price_cents = 999;
        p.name = "Renamed".to_string();

        assert_eq!(cart.items[0].unit_price_cents, 450);
        assert_eq!(cart.items[0].name, "Produto 1");
    }

    #[test]
    fn test_add_respects_stock_and_active() {
        let mut cart = Cart::new();
        let p = product("1", 450, 2);
        cart.add_item(&p, 2).unwrap();

        let err = cart.add_item(&p, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));

        let mut inactive = product("2", 100, 5);
        inactive.is_active = false;
        assert!(matches!(
            cart.add_item(&inactive, 1),
            Err(CoreError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new();
        let p = product("1", 100, 5000);

        assert!(cart.add_item(&p, 0).is_err());
        cart.add_item(&p, 999).unwrap();
        assert!(matches!(
            cart.add_item(&p, 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 450, 10), 1).unwrap();
        cart.add_item(&product("2", 200, 10), 1).unwrap();

        cart.update_quantity("1", 4).unwrap();
        assert_eq!(cart.subtotal().cents(), 2000);

        cart.update_quantity("1", 0).unwrap();
        assert_eq!(cart.item_count(), 1);

        assert!(matches!(
            cart.remove_item("missing"),
            Err(CoreError::NotInCart(_))
        ));

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&product(&i.to_string(), 100, 10), 1).unwrap();
        }
        let err = cart.add_item(&product("overflow", 100, 10), 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { max: 100 }));
    }
}
