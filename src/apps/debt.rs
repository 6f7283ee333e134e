//! Month-by-month debt payoff simulation (avalanche and snowball).

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::errors::DebtError;

const MAX_MONTHS: u32 = 1200;
const PAID_OFF: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub name: String,
    pub balance: f64,
    /// Annual percentage rate, e.g. `19.99`
    pub rate: f64,
    pub min_payment: f64,
}

impl Debt {
    pub fn new(name: impl Into<String>, balance: f64, rate: f64, min_payment: f64) -> Self {
        Self {
            name: name.into(),
            balance,
            rate,
            min_payment,
        }
    }
}

/// Which open debt receives the money left after minimum payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Highest interest rate first
    Avalanche,
    /// Smallest balance first
    Snowball,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoffPlan {
    pub strategy: Strategy,
    pub months: u32,
    pub total_interest: f64,
    pub total_paid: f64,
    pub payoff_order: Vec<String>,
}

/// Simulate paying off `debts` with a constant monthly budget.
///
/// The budget is the sum of all minimum payments plus `extra_payment`;
/// minimums freed by a paid-off debt roll over to the next target.
pub fn payoff_plan(
    debts: &[Debt],
    extra_payment: f64,
    strategy: Strategy,
) -> Result<PayoffPlan, DebtError> {
    if extra_payment < 0.0 || !extra_payment.is_finite() {
        return Err(DebtError::Invalid("extra payment".to_string()));
    }
    for debt in debts {
        let values = [debt.balance, debt.rate, debt.min_payment];
        if values.iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(DebtError::Invalid(debt.name.clone()));
        }
    }

    let mut balances: Vec<f64> = debts.iter().map(|d| d.balance).collect();
    let mut closed: Vec<bool> = balances.iter().map(|b| *b <= PAID_OFF).collect();
    let mut payoff_order = Vec::new();
    let mut total_interest = 0.0;
    let mut total_paid = 0.0;

    let budget: f64 = debts
        .iter()
        .filter(|d| d.balance > PAID_OFF)
        .map(|d| d.min_payment)
        .sum::<f64>()
        + extra_payment;

    if balances.iter().all(|b| *b <= PAID_OFF) {
        return Ok(PayoffPlan {
            strategy,
            months: 0,
            total_interest: 0.0,
            total_paid: 0.0,
            payoff_order,
        });
    }

    for month in 1..=MAX_MONTHS {
        let owed_before: f64 = balances.iter().sum();

        for (balance, debt) in balances.iter_mut().zip(debts) {
            if *balance > PAID_OFF {
                let interest = *balance * debt.rate / 100.0 / 12.0;
                *balance += interest;
                total_interest += interest;
            }
        }

        let mut remaining = budget;
        for (balance, debt) in balances.iter_mut().zip(debts) {
            if *balance > PAID_OFF {
                let payment = debt.min_payment.min(*balance).min(remaining);
                *balance -= payment;
                remaining -= payment;
            }
        }

        for index in target_order(debts, &balances, strategy) {
            if remaining <= 0.0 {
                break;
            }
            let payment = remaining.min(balances[index]);
            balances[index] -= payment;
            remaining -= payment;
        }
        total_paid += budget - remaining;

        for (index, debt) in debts.iter().enumerate() {
            if !closed[index] && balances[index] <= PAID_OFF {
                closed[index] = true;
                balances[index] = 0.0;
                payoff_order.push(debt.name.clone());
            }
        }

        if balances.iter().all(|b| *b <= PAID_OFF) {
            return Ok(PayoffPlan {
                strategy,
                months: month,
                total_interest: round_cents(total_interest),
                total_paid: round_cents(total_paid),
                payoff_order,
            });
        }

        let owed_after: f64 = balances.iter().sum();
        if owed_after >= owed_before {
            return Err(never_paid_off(debts, &balances, strategy));
        }
    }

    Err(never_paid_off(debts, &balances, strategy))
}

/// Run both strategies on the same debts.
pub fn compare(debts: &[Debt], extra_payment: f64) -> Result<(PayoffPlan, PayoffPlan), DebtError> {
    Ok((
        payoff_plan(debts, extra_payment, Strategy::Avalanche)?,
        payoff_plan(debts, extra_payment, Strategy::Snowball)?,
    ))
}

/// Plain-text summary of both plans, suitable for a prompt or a report tab.
///
/// Debts that are never paid off are described in the text; only invalid
/// input is an error.
pub fn summarize(debts: &[Debt], extra_payment: f64) -> Result<String, DebtError> {
    if debts.iter().all(|d| d.balance <= PAID_OFF) {
        return Ok("No outstanding debts.".to_string());
    }

    let total: f64 = debts.iter().map(|d| d.balance).sum();
    let mut out = String::new();
    let _ = writeln!(out, "Total debt: ${:.2}, extra payment: ${:.2}/month", total, extra_payment);

    let (avalanche, snowball) = match compare(debts, extra_payment) {
        Ok(plans) => plans,
        Err(DebtError::NeverPaidOff(name)) => {
            let _ = write!(out, "Debt '{}' is never paid off at current payments.", name);
            if let Some(debt) = debts.iter().find(|d| d.name == name) {
                let interest = debt.balance * debt.rate / 100.0 / 12.0;
                let _ = write!(
                    out,
                    " Its monthly interest of ${:.2} exceeds what the payments cover.",
                    interest
                );
            }
            return Ok(out);
        }
        Err(err) => return Err(err),
    };
    for plan in [&avalanche, &snowball] {
        let _ = writeln!(
            out,
            "{:?}: debt-free in {} months, total interest ${:.2}, payoff order: {}",
            plan.strategy,
            plan.months,
            plan.total_interest,
            plan.payoff_order.join(" -> ")
        );
    }
    let savings = snowball.total_interest - avalanche.total_interest;
    if savings > 0.0 {
        let _ = writeln!(out, "Avalanche saves ${:.2} in interest.", savings);
    }
    Ok(out.trim_end().to_string())
}

fn target_order(debts: &[Debt], balances: &[f64], strategy: Strategy) -> Vec<usize> {
    let mut open: Vec<usize> = (0..debts.len()).filter(|i| balances[*i] > PAID_OFF).collect();
    open.sort_by(|a, b| {
        let (da, db) = (&debts[*a], &debts[*b]);
        match strategy {
            Strategy::Avalanche => db
                .rate
                .total_cmp(&da.rate)
                .then(balances[*a].total_cmp(&balances[*b])),
            Strategy::Snowball => balances[*a]
                .total_cmp(&balances[*b])
                .then(db.rate.total_cmp(&da.rate)),
        }
    });
    open
}

fn never_paid_off(debts: &[Debt], balances: &[f64], strategy: Strategy) -> DebtError {
    let name = target_order(debts, balances, strategy)
        .first()
        .map(|i| debts[*i].name.clone())
        .unwrap_or_default();
    DebtError::NeverPaidOff(name)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
