//! # Payment Fees
//!
//! What Mercado Pago keeps from each sale. PIX and debit are a flat rate;
//! credit depends on how many installments the customer chose.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────────┐
//! │ Method       │ Rate                                                 │
//! ├──────────────┼──────────────────────────────────────────────────────┤
//! │ pix          │ pix_bps                                              │
//! │ debit        │ debit_bps                                            │
//! │ credit N×    │ credit_bps[N-1] for N in 1..=10, else credit_bps[0]  │
//! └──────────────┴──────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};
use crate::types::PaymentMethod;
use crate::MAX_INSTALLMENTS;

/// Fee configuration, loaded from the `[fees]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeTable {
    pub pix_bps: Rate,
    pub debit_bps: Rate,
    /// Index 0 is 1x, index 9 is 10x.
    pub credit_bps: [Rate; MAX_INSTALLMENTS as usize],
}

impl Default for FeeTable {
    fn default() -> Self {
        FeeTable {
            pix_bps: Rate::from_bps(99),
            debit_bps: Rate::from_bps(199),
            credit_bps: [
                Rate::from_bps(498),
                Rate::from_bps(939),
                Rate::from_bps(1029),
                Rate::from_bps(1119),
                Rate::from_bps(1209),
                Rate::from_bps(1299),
                Rate::from_bps(1389),
                Rate::from_bps(1479),
                Rate::from_bps(1569),
                Rate::from_bps(1659),
            ],
        }
    }
}

impl FeeTable {
    /// Rate applied for `method` paid in `installments`.
    ///
    /// Out-of-range installment counts fall back to the 1x credit rate.
    pub fn rate_for(&self, method: PaymentMethod, installments: i64) -> Rate {
        match method {
            PaymentMethod::Pix => self.pix_bps,
            PaymentMethod::Debit => self.debit_bps,
            PaymentMethod::Credit => {
                let index = if (1..=MAX_INSTALLMENTS).contains(&installments) {
                    (installments - 1) as usize
                } else {
                    0
                };
                self.credit_bps[index]
            }
        }
    }

    /// Fee charged on `amount`, rounded half-up to the centavo.
    ///
    /// ```rust
    /// use mercadinho_core::{FeeTable, Money, PaymentMethod};
    ///
    /// let fees = FeeTable::default();
    /// let fee = fees.calculate_payment_fee(Money::from_cents(10_000), PaymentMethod::Credit, 1);
    /// assert_eq!(fee.cents(), 498);
    /// ```
    pub fn calculate_payment_fee(
        &self,
        amount: Money,
        method: PaymentMethod,
        installments: i64,
    ) -> Money {
        amount.percentage(self.rate_for(method, installments))
    }
}
