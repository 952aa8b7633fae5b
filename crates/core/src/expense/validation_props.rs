//! Property-based tests for expense field validation.
//!
//! Only positive amounts in a supported currency are ever accepted.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::ExpenseError;
use super::validation::validate_fields;

fn supported() -> Vec<String> {
    ["USD", "EUR", "GBP", "INR", "JPY", "CAD", "AUD"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Amounts from -1,000,000.00 to 1,000,000.00.
fn any_amount() -> impl Strategy<Value = Decimal> {
    (-100_000_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Accepted iff amount > 0 and currency is supported.
    #[test]
    fn prop_accepts_only_positive_supported(
        amount in any_amount(),
        currency in prop_oneof![
            Just("USD".to_string()),
            Just("eur".to_string()),
            Just("XYZ".to_string()),
            "[A-Z]{3}",
        ],
    ) {
        let result = validate_fields("Merchant", amount, &currency, &supported());
        let currency_ok = supported().iter().any(|c| c.eq_ignore_ascii_case(&currency));

        if amount > Decimal::ZERO && currency_ok {
            prop_assert_eq!(result.unwrap(), currency.to_uppercase());
        } else if amount <= Decimal::ZERO {
            let is_invalid_amount = matches!(result, Err(ExpenseError::InvalidAmount(_)));
            prop_assert!(is_invalid_amount);
        } else {
            let is_unsupported = matches!(result, Err(ExpenseError::UnsupportedCurrency(_)));
            prop_assert!(is_unsupported);
        }
    }
}
