//! Property-based tests for the auto-approval decision.
//!
//! Nothing above the owner's limit is ever fast-tracked, whatever its
//! category.

use expensa_shared::config::ApprovalConfig;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::{ApprovalPolicy, Decision};

/// Amounts from 0.01 to 100,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Limits from -1,000.00 to 100,000.00; limits can be overdrawn.
fn any_limit() -> impl Strategy<Value = Decimal> {
    (-100_000i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Meals".to_string()),
        Just("office supplies".to_string()),
        Just("TRANSPORTATION".to_string()),
        Just("Travel".to_string()),
        Just("Others".to_string()),
        "[A-Za-z ]{1,20}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Above the limit never fast-tracks.
    #[test]
    fn prop_never_fast_track_above_limit(
        category in category(),
        amount in positive_amount(),
        limit in any_limit(),
        enabled in any::<bool>(),
    ) {
        let policy = ApprovalPolicy::from_config(&ApprovalConfig {
            auto_approval_enabled: enabled,
            ..ApprovalConfig::default()
        });
        let decision = policy.decide(&category, amount, limit);

        if amount > limit {
            prop_assert_ne!(decision, Decision::FastTrack);
        }
    }

    /// Within the limit, fast-track categories always fast-track.
    #[test]
    fn prop_fast_track_within_limit(
        category in prop_oneof![
            Just("meals"),
            Just("Office Supplies"),
            Just("Transportation"),
        ],
        amount in positive_amount(),
        headroom in positive_amount(),
    ) {
        let policy = ApprovalPolicy::from_config(&ApprovalConfig::default());
        prop_assert_eq!(
            policy.decide(category, amount, amount + headroom),
            Decision::FastTrack
        );
    }
}
