//! Budget ledger types and pure calculations.

use expensa_shared::types::DepartmentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of debiting an allotted limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDebit {
    /// Limit before the debit.
    pub previous: Decimal,
    /// Limit after the debit.
    pub new_limit: Decimal,
    /// True when the debit took the limit below zero.
    pub overdrawn: bool,
}

/// Debits `amount` from `limit`. No floor is applied.
#[must_use]
pub fn debit(limit: Decimal, amount: Decimal) -> LedgerDebit {
    let new_limit = limit - amount;
    LedgerDebit {
        previous: limit,
        new_limit,
        overdrawn: new_limit < Decimal::ZERO,
    }
}

/// Department budget consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentUtilization {
    /// Department.
    pub department_id: DepartmentId,
    /// Sum of approved expenses of the department's members.
    pub spent: Decimal,
    /// Total budget allocated to the department.
    pub allocated: Decimal,
    /// Share of the allocation still unspent, in percent.
    pub remaining_pct: Decimal,
}

/// Percentage of `allocated` not yet spent, rounded to 2 dp.
///
/// Zero when nothing is allocated. Negative once spend exceeds allocation.
#[must_use]
pub fn remaining_pct(spent: Decimal, allocated: Decimal) -> Decimal {
    if allocated.is_zero() {
        Decimal::ZERO
    } else {
        ((allocated - spent) / allocated * Decimal::ONE_HUNDRED).round_dp(2)
    }
}
