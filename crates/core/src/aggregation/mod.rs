//! Aggregation engine.
//!
//! Groups approved expenses by category, month, employee and merchant,
//! computes shares of the batch total, and classifies the month-over-month
//! trend.

pub mod engine;
pub mod grouping;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{AggregationEngine, AggregationScope};
pub use grouping::{AppearanceGroups, MonthGroups, percentage};
pub use types::{
    ExpenseSummary, GroupTotal, LargestExpense, MerchantTotal, TrendDirection, TrendSummary,
};
