//! Aggregation output types.
//!
//! The summary is persisted on the report as JSON and fed to both the
//! analysis request and the rendered document.

use chrono::NaiveDate;
use expensa_shared::types::ExpenseId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Totals for one group (category, month or employee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotal {
    /// Grouping key: category name, `YYYY-MM`, or user id.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Number of expenses.
    pub count: u64,
    /// Summed amount.
    pub amount: Decimal,
    /// Share of the batch total, in percent.
    pub percentage: Decimal,
}

/// Totals for one merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantTotal {
    /// Merchant name.
    pub merchant: String,
    /// Number of expenses.
    pub count: u64,
    /// Summed amount.
    pub amount: Decimal,
    /// Share of the batch total, in percent.
    pub percentage: Decimal,
}

/// Month-over-month movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// More than 10% up.
    SignificantIncrease,
    /// Up by at most 10%.
    SlightIncrease,
    /// No change.
    Stable,
    /// Down by at most 10%.
    SlightDecrease,
    /// More than 10% down.
    SignificantDecrease,
    /// Fewer than two populated months.
    NotEnoughData,
}

impl TrendDirection {
    /// Classifies a percentage change.
    #[must_use]
    pub fn classify(change_pct: Decimal) -> Self {
        let ten = Decimal::TEN;
        if change_pct > ten {
            Self::SignificantIncrease
        } else if change_pct > Decimal::ZERO {
            Self::SlightIncrease
        } else if change_pct.is_zero() {
            Self::Stable
        } else if change_pct >= -ten {
            Self::SlightDecrease
        } else {
            Self::SignificantDecrease
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignificantIncrease => "significant increase",
            Self::SlightIncrease => "slight increase",
            Self::Stable => "stable",
            Self::SlightDecrease => "slight decrease",
            Self::SignificantDecrease => "significant decrease",
            Self::NotEnoughData => "not enough data",
        }
    }
}

/// Trend between the two most recent populated months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Classification.
    pub direction: TrendDirection,
    /// Earlier month, `YYYY-MM`.
    pub previous_month: Option<String>,
    /// Later month, `YYYY-MM`.
    pub current_month: Option<String>,
    /// Percentage change, rounded to 2 dp.
    pub change_pct: Option<Decimal>,
}

impl TrendSummary {
    /// The trend when fewer than two months are populated.
    #[must_use]
    pub fn not_enough_data() -> Self {
        Self {
            direction: TrendDirection::NotEnoughData,
            previous_month: None,
            current_month: None,
            change_pct: None,
        }
    }
}

/// The single largest expense in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestExpense {
    /// Expense id.
    pub expense_id: ExpenseId,
    /// Merchant name.
    pub merchant: String,
    /// Amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Expense date.
    pub expense_date: Option<NaiveDate>,
}

/// Aggregated view of a set of approved expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    /// Number of expenses.
    pub total_count: u64,
    /// Summed amount.
    pub total_amount: Decimal,
    /// Mean amount, rounded to 2 dp.
    pub average_amount: Decimal,
    /// Largest single expense.
    pub largest_expense: Option<LargestExpense>,
    /// Reporting currency every figure is expressed in.
    pub currency: String,
    /// First day of the covered period.
    pub period_from: NaiveDate,
    /// Last day of the covered period.
    pub period_to: NaiveDate,
    /// By category, in order of first appearance.
    pub by_category: Vec<GroupTotal>,
    /// By calendar month, ascending.
    pub by_month: Vec<GroupTotal>,
    /// By employee, team reports only.
    pub by_employee: Vec<GroupTotal>,
    /// Highest-spend merchants.
    pub top_merchants: Vec<MerchantTotal>,
    /// Month-over-month trend.
    pub trend: TrendSummary,
}
