//! # Cash Flow
//!
//! Back-office rollups over a period's orders and expenses.
//!
//! Only `approved` orders count: a pending PIX that expired or a rejected
//! card never brought money in. Cost of goods uses the product's *current*
//! cost, looked up by the caller, since order snapshots carry sale prices
//! only.
//!
//! ```text
//!   revenue       = Σ order.total                  (approved)
//!   cost          = Σ cost(product) × qty          (approved lines)
//!   fees          = Σ FeeTable(order.total, method, installments)
//!   gross_profit  = revenue − cost
//!   net_profit    = gross_profit − expenses − fees
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::fees::FeeTable;
use crate::money::Money;
use crate::types::{Expense, Order, PaymentMethod, PaymentStatus};

/// Revenue attributed to one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodRevenue {
    pub method: PaymentMethod,
    pub order_count: i64,
    pub revenue_cents: i64,
}

/// Period rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashFlowSummary {
    pub order_count: i64,
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub expenses_cents: i64,
    pub fees_cents: i64,
    pub gross_profit_cents: i64,
    pub net_profit_cents: i64,
    pub average_ticket_cents: i64,
    pub by_method: Vec<MethodRevenue>,
}

/// One day of the rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyCashFlow {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub summary: CashFlowSummary,
}

/// Aggregates approved orders and expenses into a [`CashFlowSummary`].
///
/// `costs` maps product id to current cost in centavos; products missing
/// from it count as zero cost.
pub fn summarize(
    orders: &[Order],
    costs: &HashMap<String, i64>,
    expenses: &[Expense],
    fees: &FeeTable,
) -> CashFlowSummary {
    let mut revenue = Money::zero();
    let mut cost = Money::zero();
    let mut fee_total = Money::zero();
    let mut order_count = 0i64;
    let mut by_method: BTreeMap<PaymentMethod, (i64, Money)> = BTreeMap::new();

    for order in orders
        .iter()
        .filter(|o| o.payment_status == PaymentStatus::Approved)
    {
        order_count += 1;
        revenue += order.total();
        fee_total +=
            fees.calculate_payment_fee(order.total(), order.payment_method, order.installments);

        for item in &order.items {
            let unit_cost = costs.get(&item.product_id).copied().unwrap_or(0);
            cost += Money::from_cents(unit_cost).multiply_quantity(item.quantity);
        }

        let entry = by_method
            .entry(order.payment_method)
            .or_insert((0, Money::zero()));
        entry.0 += 1;
        entry.1 += order.total();
    }

    let expenses_total: Money = expenses
        .iter()
        .map(|e| Money::from_cents(e.amount_cents))
        .sum();

    let gross_profit = revenue - cost;
    let net_profit = gross_profit - expenses_total - fee_total;
    let average_ticket = if order_count > 0 {
        revenue.cents() / order_count
    } else {
        0
    };

    CashFlowSummary {
        order_count,
        revenue_cents: revenue.cents(),
        cost_cents: cost.cents(),
        expenses_cents: expenses_total.cents(),
        fees_cents: fee_total.cents(),
        gross_profit_cents: gross_profit.cents(),
        net_profit_cents: net_profit.cents(),
        average_ticket_cents: average_ticket,
        by_method: by_method
            .into_iter()
            .map(|(method, (count, revenue))| MethodRevenue {
                method,
                order_count: count,
                revenue_cents: revenue.cents(),
            })
            .collect(),
    }
}

/// Same rollup grouped by UTC calendar day, oldest first.
///
/// Days with only expenses (or only orders) still appear.
pub fn daily(
    orders: &[Order],
    costs: &HashMap<String, i64>,
    expenses: &[Expense],
    fees: &FeeTable,
) -> Vec<DailyCashFlow> {
    let mut days: BTreeMap<NaiveDate, (Vec<Order>, Vec<Expense>)> = BTreeMap::new();

    for order in orders {
        days.entry(order.created_at.date_naive())
            .or_default()
            .0
            .push(order.clone());
    }
    for expense in expenses {
        days.entry(expense.incurred_at.date_naive())
            .or_default()
            .1
            .push(expense.clone());
    }

    days.into_iter()
        .map(|(date, (orders, expenses))| DailyCashFlow {
            date,
            summary: summarize(&orders, costs, &expenses, fees),
        })
        .collect()
}
