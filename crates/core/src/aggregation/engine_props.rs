//! Property-based tests for aggregation consistency.
//!
//! Category sums, month sums and the total always agree, and the merchant
//! ranking is ordered by amount then name.

use std::collections::HashMap;

use chrono::NaiveDate;
use expensa_shared::types::UserId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::{AggregationEngine, AggregationScope};
use crate::testing::approved_expense;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..5_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (0i64..730).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default() + chrono::Duration::days(offset)
    })
}

fn item() -> impl Strategy<Value = (String, String, Decimal, NaiveDate)> {
    (
        prop_oneof![Just("A"), Just("B"), Just("C"), Just("D"), Just("E"), Just("F")],
        prop_oneof![Just("Travel"), Just("Meals"), Just("Others")],
        amount(),
        date(),
    )
        .prop_map(|(m, c, a, d)| (m.to_string(), c.to_string(), a, d))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_group_sums_match_total(items in prop::collection::vec(item(), 0..40)) {
        let owner = UserId::new();
        let expenses: Vec<_> = items
            .iter()
            .map(|(m, c, a, d)| approved_expense(owner, m, c, *a, *d))
            .collect();
        let scope = AggregationScope {
            from: NaiveDate::MIN,
            to: NaiveDate::MAX,
            by_employee: true,
            employee_names: HashMap::new(),
        };
        let summary = AggregationEngine::new(3, "USD").aggregate(&expenses, &scope);

        let expected: Decimal = items.iter().map(|(_, _, a, _)| *a).sum();
        let by_category: Decimal = summary.by_category.iter().map(|g| g.amount).sum();
        let by_month: Decimal = summary.by_month.iter().map(|g| g.amount).sum();
        let by_employee: Decimal = summary.by_employee.iter().map(|g| g.amount).sum();

        prop_assert_eq!(summary.total_amount, expected);
        prop_assert_eq!(by_category, expected);
        prop_assert_eq!(by_month, expected);
        prop_assert_eq!(by_employee, expected);
        prop_assert_eq!(summary.total_count, items.len() as u64);
        prop_assert!(summary.top_merchants.len() <= 3);

        for pair in summary.top_merchants.windows(2) {
            prop_assert!(
                pair[0].amount > pair[1].amount
                    || (pair[0].amount == pair[1].amount && pair[0].merchant < pair[1].merchant)
            );
        }
        for pair in summary.by_month.windows(2) {
            prop_assert!(pair[0].key < pair[1].key);
        }
    }
}
