//! Field validation applied before an expense is persisted.

use rust_decimal::Decimal;

use crate::expense::error::ExpenseError;

/// Validates merchant, amount and currency.
///
/// Returns the canonical (uppercase) currency code.
///
/// # Errors
///
/// * `ExpenseError::MissingField` if the merchant or currency is blank
/// * `ExpenseError::InvalidAmount` if the amount is zero or negative
/// * `ExpenseError::UnsupportedCurrency` if the currency is not accepted
pub fn validate_fields(
    merchant: &str,
    amount: Decimal,
    currency: &str,
    supported_currencies: &[String],
) -> Result<String, ExpenseError> {
    if merchant.trim().is_empty() {
        return Err(ExpenseError::MissingField("merchant"));
    }

    if amount <= Decimal::ZERO {
        return Err(ExpenseError::InvalidAmount(amount));
    }

    let code = currency.trim().to_uppercase();
    if code.is_empty() {
        return Err(ExpenseError::MissingField("currency"));
    }
    if !supported_currencies.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
        return Err(ExpenseError::UnsupportedCurrency(code));
    }

    Ok(code)
}
