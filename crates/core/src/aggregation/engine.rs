//! Aggregation of approved expenses into a report summary.

use std::collections::HashMap;

use chrono::NaiveDate;
use expensa_shared::types::UserId;
use rust_decimal::Decimal;

use super::grouping::{AppearanceGroups, MonthGroups, percentage};
use super::types::{
    ExpenseSummary, LargestExpense, MerchantTotal, TrendDirection, TrendSummary,
};
use crate::expense::types::Expense;

/// What the summary covers.
#[derive(Debug, Clone)]
pub struct AggregationScope {
    /// First day of the period.
    pub from: NaiveDate,
    /// Last day of the period.
    pub to: NaiveDate,
    /// Whether to group by employee (team reports).
    pub by_employee: bool,
    /// Display names for employee grouping.
    pub employee_names: HashMap<UserId, String>,
}

/// Groups, ranks and classifies an expense set.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    top_merchants: usize,
    currency: String,
}

impl AggregationEngine {
    /// Creates an engine ranking `top_merchants` merchants and reporting in
    /// `currency`.
    #[must_use]
    pub fn new(top_merchants: usize, currency: impl Into<String>) -> Self {
        Self {
            top_merchants,
            currency: currency.into(),
        }
    }

    /// Aggregates `expenses`, expected newest expense date first.
    ///
    /// Amounts are summed as stored; no currency conversion happens.
    #[must_use]
    pub fn aggregate(&self, expenses: &[Expense], scope: &AggregationScope) -> ExpenseSummary {
        let mut total_amount = Decimal::ZERO;
        let mut categories: AppearanceGroups<String> = AppearanceGroups::default();
        let mut months = MonthGroups::default();
        let mut employees: AppearanceGroups<UserId> = AppearanceGroups::default();
        let mut merchants: AppearanceGroups<String> = AppearanceGroups::default();
        let mut largest: Option<&Expense> = None;

        for expense in expenses {
            total_amount += expense.amount;

            categories.add(
                expense.category.clone(),
                || expense.category.clone(),
                expense.amount,
            );

            // Approved expenses always carry a date; fall back to intake day.
            let date = expense
                .expense_date
                .unwrap_or_else(|| expense.created_at.date_naive());
            months.add(date, expense.amount);

            if scope.by_employee {
                employees.add(
                    expense.owner_id,
                    || {
                        scope
                            .employee_names
                            .get(&expense.owner_id)
                            .cloned()
                            .unwrap_or_else(|| expense.owner_id.to_string())
                    },
                    expense.amount,
                );
            }

            merchants.add(
                expense.merchant.clone(),
                || expense.merchant.clone(),
                expense.amount,
            );

            if largest.is_none_or(|l| expense.amount > l.amount) {
                largest = Some(expense);
            }
        }

        let total_count = expenses.len() as u64;
        let average_amount = if total_count == 0 {
            Decimal::ZERO
        } else {
            (total_amount / Decimal::from(total_count)).round_dp(2)
        };

        ExpenseSummary {
            total_count,
            total_amount,
            average_amount,
            largest_expense: largest.map(|e| LargestExpense {
                expense_id: e.id,
                merchant: e.merchant.clone(),
                amount: e.amount,
                category: e.category.clone(),
                expense_date: e.expense_date,
            }),
            currency: self.currency.clone(),
            period_from: scope.from,
            period_to: scope.to,
            by_category: categories.totals(total_amount),
            by_month: months.totals(total_amount),
            by_employee: employees.totals(total_amount),
            top_merchants: rank_merchants(merchants, total_amount, self.top_merchants),
            trend: trend(&months),
        }
    }
}

/// Ranks merchants by amount descending, then name ascending.
fn rank_merchants(
    merchants: AppearanceGroups<String>,
    total: Decimal,
    limit: usize,
) -> Vec<MerchantTotal> {
    let mut ranked: Vec<MerchantTotal> = merchants
        .into_entries()
        .into_iter()
        .map(|(merchant, bucket)| MerchantTotal {
            merchant,
            count: bucket.count,
            amount: bucket.amount,
            percentage: percentage(bucket.amount, total),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    ranked.truncate(limit);
    ranked
}

/// Compares the two most recent populated months.
fn trend(months: &MonthGroups) -> TrendSummary {
    let amounts: Vec<(String, Decimal)> = months.amounts().collect();
    let [.., (previous_month, previous), (current_month, current)] = amounts.as_slice() else {
        return TrendSummary::not_enough_data();
    };

    if previous.is_zero() {
        return TrendSummary::not_enough_data();
    }

    let change = (*current - *previous) / *previous * Decimal::ONE_HUNDRED;
    TrendSummary {
        direction: TrendDirection::classify(change),
        previous_month: Some(previous_month.clone()),
        current_month: Some(current_month.clone()),
        change_pct: Some(change.round_dp(2)),
    }
}
