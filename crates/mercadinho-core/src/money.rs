//! # Money Module
//!
//! `Money` (integer centavos) and `Rate` (basis points).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    4.50 + 2.00 + 0.10 in f64 = 6.6000000000000005                      │
//! │                                                                         │
//! │  A PIX charge for R$ 6,6000000000000005 is rejected by the provider,   │
//! │  and a cash-flow report summing thousands of orders drifts.            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer centavos everywhere                              │
//! │    450 + 200 + 10 = 660 centavos, exactly                               │
//! │    Floats appear only at the Mercado Pago boundary (transaction_amount) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mercadinho_core::money::{Money, Rate};
//!
//! let price = Money::from_cents(450); // R$ 4,50
//! let line = price * 2;               // R$ 9,00
//! let fee = line.percentage(Rate::from_bps(99)); // 0.99% PIX fee
//! assert_eq!(fee.cents(), 9);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// 1 bps = 0.01%. Customer discounts and processor fees are both rates:
/// `1000` is a 10% loyalty discount, `498` is the 4.98% credit 1x fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage, rounding to the nearest bps.
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest BRL unit).
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► CartItem.unit_price ──► CartItem.line_total    │
/// │                                                                         │
/// │  Cart.subtotal ──► customer discount ──► Order.total                    │
/// │                                              │                          │
/// │                          ┌───────────────────┼──────────────────┐       │
/// │                          ▼                   ▼                  ▼       │
/// │                  PIX amount (reais)   Point amount (centavos)  fees     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ```rust
    /// use mercadinho_core::money::Money;
    ///
    /// let price = Money::from_cents(450); // R$ 4,50
    /// assert_eq!(price.cents(), 450);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// For negative amounts, only `reais` should be negative:
    /// `from_reais(-5, 50)` is -R$ 5,50.
    #[inline]
    pub const fn from_reais(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais * 100 - centavos)
        } else {
            Money(reais * 100 + centavos)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `rate` of this amount, rounded half-up to the centavo.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 is the
    /// half-centavo that turns truncation into rounding.
    ///
    /// ```rust
    /// use mercadinho_core::money::{Money, Rate};
    ///
    /// // 10% of R$ 6,55 = 65.5 centavos → 66
    /// let discount = Money::from_cents(655).percentage(Rate::from_bps(1000));
    /// assert_eq!(discount.cents(), 66);
    /// ```
    pub fn percentage(&self, rate: Rate) -> Money {
        // i128 so large report totals cannot overflow
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Amount in reais as a decimal, for provider fields that take
    /// `transaction_amount: 6.5` instead of centavos.
    pub fn to_reais_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Brazilian formatting: `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.reais().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_and_parts() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);

        assert_eq!(Money::from_reais(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display_brl() {
        assert_eq!(Money::from_cents(650).to_string(), "R$ 6,50");
        assert_eq!(Money::from_cents(5).to_string(), "R$ 0,05");
        assert_eq!(Money::from_cents(123456).to_string(), "R$ 1.234,56");
        assert_eq!(Money::from_cents(100000000).to_string(), "R$ 1.000.000,00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(450);
        let b = Money::from_cents(200);
        assert_eq!((a + b).cents(), 650);
        assert_eq!((a - b).cents(), 250);
        assert_eq!((a * 3).cents(), 1350);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 850);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percentage(Rate::from_bps(1000)).cents(), 100);
        // R$ 10,00 × 4.98% = 49.8 → 50
        assert_eq!(amount.percentage(Rate::from_bps(498)).cents(), 50);
        // R$ 6,50 × 0.99% = 6.435 → 6
        assert_eq!(Money::from_cents(650).percentage(Rate::from_bps(99)).cents(), 6);
        assert!(amount.percentage(Rate::zero()).is_zero());
    }

    #[test]
    fn test_rate_conversions() {
        let rate = Rate::from_percentage(4.98);
        assert_eq!(rate.bps(), 498);
        assert!((rate.percentage() - 4.98).abs() < 1e-9);
        assert_eq!(Rate::from_percentage(-3.0).bps(), 0);
    }

    #[test]
    fn test_to_reais_f64() {
        assert!((Money::from_cents(650).to_reais_f64() - 6.5).abs() < 1e-9);
    }
}
