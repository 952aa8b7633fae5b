//! Policy compliance check contract.
//!
//! The model answers with `COMPLIANT`, an `OVER_LIMIT` variant, or free
//! text explaining why the expense breaks policy.

use rust_decimal::Decimal;

use crate::ai::{AiError, ModelRequest};
use crate::expense::types::Expense;

const COMPLIANCE_SYSTEM: &str = "You are an expense policy auditor. Answer with exactly one of: \
COMPLIANT, OVER_LIMIT, or a single sentence explaining which policy rule the expense breaks.";

/// Outcome of a compliance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceVerdict {
    /// Within policy.
    Compliant,
    /// Within policy but above the owner's limit.
    CompliantOverLimit,
    /// Breaks policy; carries the model's text verbatim.
    Rejected(String),
}

impl ComplianceVerdict {
    /// Parses the model's answer.
    ///
    /// # Errors
    ///
    /// Returns `AiError::EmptyResponse` for a blank answer.
    pub fn parse(text: &str) -> Result<Self, AiError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        let marker = trimmed
            .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '.' | '*'))
            .to_uppercase();

        if marker.starts_with("OVER_LIMIT")
            || (marker.starts_with("COMPLIANT") && marker.contains("OVER_LIMIT"))
        {
            Ok(Self::CompliantOverLimit)
        } else if marker == "COMPLIANT" {
            Ok(Self::Compliant)
        } else {
            Ok(Self::Rejected(trimmed.to_string()))
        }
    }

    /// Returns true unless the verdict is a rejection.
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// The fields the compliance check sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceRequest {
    /// Expense category.
    pub category: String,
    /// Amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Merchant name.
    pub merchant: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Owner's remaining limit at evaluation time.
    pub remaining_limit: Decimal,
}

impl ComplianceRequest {
    /// Builds the request for an expense.
    #[must_use]
    pub fn for_expense(expense: &Expense, remaining_limit: Decimal) -> Self {
        Self {
            category: expense.category.clone(),
            amount: expense.amount,
            currency: expense.currency.clone(),
            merchant: expense.merchant.clone(),
            description: expense.description.clone(),
            remaining_limit,
        }
    }

    /// Renders the model request against `policy`.
    #[must_use]
    pub fn to_model_request(&self, policy: &str) -> ModelRequest {
        let prompt = format!(
            "Company expense policy:\n{policy}\n\n\
             Expense under review:\n\
             - Category: {category}\n\
             - Amount: {amount} {currency}\n\
             - Merchant: {merchant}\n\
             - Description: {description}\n\
             - Employee remaining limit: {limit} {currency}\n\n\
             If the expense follows the policy answer COMPLIANT. If it follows the policy \
             but exceeds the remaining limit answer OVER_LIMIT. Otherwise explain the violation.",
            category = self.category,
            amount = self.amount,
            currency = self.currency,
            merchant = self.merchant,
            description = self.description.as_deref().unwrap_or("(none)"),
            limit = self.remaining_limit,
        );
        ModelRequest::new(prompt).with_system(COMPLIANCE_SYSTEM)
    }
}
