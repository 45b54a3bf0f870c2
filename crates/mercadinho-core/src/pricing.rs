//! # Pricing
//!
//! Margin and sale-price helpers used by the product form in the
//! back-office. All functions are total: the only edge case is a zero cost,
//! which yields a 0% margin instead of dividing by zero.
//!
//! ```text
//!   margin %   = (price − cost) / cost × 100
//!   sale price = cost × (1 + margin % / 100)
//!   profit     = price − cost
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Markup over cost, in percent. Zero when `cost` is zero.
///
/// ```rust
/// use mercadinho_core::money::Money;
/// use mercadinho_core::pricing::calculate_margin;
///
/// assert_eq!(calculate_margin(Money::from_cents(300), Money::from_cents(450)), 50.0);
/// assert_eq!(calculate_margin(Money::zero(), Money::from_cents(450)), 0.0);
/// ```
pub fn calculate_margin(cost: Money, price: Money) -> f64 {
    if cost.is_zero() {
        return 0.0;
    }
    (price - cost).cents() as f64 / cost.cents() as f64 * 100.0
}

/// Sale price for a cost and a markup percentage, rounded to the centavo.
pub fn calculate_sale_price(cost: Money, margin_pct: f64) -> Money {
    let cents = cost.cents() as f64 * (1.0 + margin_pct / 100.0);
    Money::from_cents(cents.round() as i64)
}

/// Gross profit per unit.
#[inline]
pub fn calculate_profit(cost: Money, price: Money) -> Money {
    price - cost
}

/// Pricing figures shown next to a product in the back-office.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSummary {
    pub cost_cents: i64,
    pub price_cents: i64,
    pub profit_cents: i64,
    pub margin_pct: f64,
}

impl PricingSummary {
    pub fn new(cost: Money, price: Money) -> Self {
        PricingSummary {
            cost_cents: cost.cents(),
            price_cents: price.cents(),
            profit_cents: calculate_profit(cost, price).cents(),
            margin_pct: calculate_margin(cost, price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_zero_cost_is_zero() {
        for price in [0, 1, 450, 1_000_000] {
            assert_eq!(calculate_margin(Money::zero(), Money::from_cents(price)), 0.0);
        }
    }

    #[test]
    fn test_margin_negative_when_selling_below_cost() {
        let margin = calculate_margin(Money::from_cents(400), Money::from_cents(300));
        assert!((margin + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_sale_price_margin_round_trip() {
        let cases = [
            (300, 450),
            (199, 350),
            (1, 3),
            (777, 1_299),
            (4_390, 4_391),
            (250, 200),
            (12_345, 98_765),
        ];
        for (cost, price) in cases {
            let cost = Money::from_cents(cost);
            let price = Money::from_cents(price);
            let margin = calculate_margin(cost, price);
            assert_eq!(calculate_sale_price(cost, margin), price, "cost {cost}");
        }
    }

    #[test]
    fn test_sale_price_rounds_to_centavo() {
        // 333 × 1.10 = 366.3
        assert_eq!(calculate_sale_price(Money::from_cents(333), 10.0).cents(), 366);
        assert_eq!(calculate_sale_price(Money::zero(), 80.0).cents(), 0);
    }

    #[test]
    fn test_pricing_summary() {
        let summary = PricingSummary::new(Money::from_cents(300), Money::from_cents(450));
        assert_eq!(summary.profit_cents, 150);
        assert_eq!(summary.margin_pct, 50.0);
    }
}
