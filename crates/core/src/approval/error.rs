//! Auto-approval errors.

use expensa_shared::types::{ExpenseId, UserId};
use expensa_shared::{AppError, ErrorCategory};
use serde::Serialize;
use thiserror::Error;

use crate::ai::AiError;
use crate::budget::BudgetError;
use crate::expense::error::ExpenseError;
use crate::store::StoreError;

/// Failure evaluating or confirming a single expense.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The expense owner no longer exists.
    #[error("Owner {0} not found")]
    OwnerNotFound(UserId),

    /// The owner has no allotted limit to check against.
    #[error("Owner {0} has no allotted limit configured")]
    LimitNotConfigured(UserId),

    /// The compliance check failed or timed out.
    #[error("Compliance check failed: {0}")]
    Compliance(#[from] AiError),

    /// The state machine refused the transition.
    #[error(transparent)]
    Transition(#[from] ExpenseError),

    /// The limit debit failed after approval.
    #[error("Limit debit failed: {0}")]
    Ledger(#[from] BudgetError),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApprovalError {
    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::OwnerNotFound(_) => ErrorCategory::NotFound,
            Self::LimitNotConfigured(_) => ErrorCategory::Validation,
            Self::Compliance(_) => ErrorCategory::ExternalService,
            Self::Transition(e) => e.category(),
            Self::Ledger(e) => e.category(),
            Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            Self::LimitNotConfigured(_) => "LIMIT_NOT_CONFIGURED",
            Self::Compliance(e) => e.error_code(),
            Self::Transition(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        Self::domain(err.category(), err.error_code(), err.to_string())
    }
}

/// One failed item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemError {
    /// The expense that failed.
    pub expense_id: ExpenseId,
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl BatchItemError {
    /// Records `err` against `expense_id`.
    #[must_use]
    pub fn new(expense_id: ExpenseId, err: &ApprovalError) -> Self {
        Self {
            expense_id,
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}
