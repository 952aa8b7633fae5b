//! Expense error types.
//!
//! This module defines the errors raised by intake, draft editing and
//! lifecycle transitions.

use expensa_shared::types::{DepartmentId, ExpenseId, UserId};
use expensa_shared::{AppError, ErrorCategory};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::expense::types::ExpenseState;
use crate::store::StoreError;

/// Errors that can occur during expense operations.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Amount is zero or negative.
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// Currency code is not in the supported set.
    #[error("Currency {0} is not supported")]
    UnsupportedCurrency(String),

    /// A field required for the operation is missing or blank.
    #[error("Field {0} is required")]
    MissingField(&'static str),

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Attempted an invalid lifecycle transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current state.
        from: ExpenseState,
        /// The attempted target state.
        to: ExpenseState,
    },

    /// Attempted to edit or delete an expense that is no longer a draft.
    #[error("Expense is {0} and can no longer be edited")]
    NotEditable(ExpenseState),

    /// A receipt with the same fingerprint was already filed by this owner.
    #[error("This receipt was already submitted as expense {0}")]
    DuplicateReceipt(ExpenseId),

    /// Same merchant and amount filed inside the duplicate window.
    #[error("An expense of {amount} at {merchant} was filed recently as expense {existing}")]
    DuplicateSubmission {
        /// The earlier expense.
        existing: ExpenseId,
        /// Merchant name.
        merchant: String,
        /// Amount.
        amount: Decimal,
    },

    /// Expense not found.
    #[error("Expense {0} not found")]
    NotFound(ExpenseId),

    /// User not found.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Department not found.
    #[error("Department {0} not found")]
    DepartmentNotFound(DepartmentId),

    /// Actor may not decide on this expense.
    #[error("User {0} is not authorized to decide on this expense")]
    NotAuthorized(UserId),

    /// Receipt extraction failed or returned unusable data.
    #[error("Receipt extraction failed: {0}")]
    Extraction(String),

    /// Approval debit failed after the status change.
    #[error("Budget ledger error: {0}")]
    Ledger(String),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ExpenseError {
    /// Returns the failure category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAmount(_)
            | Self::UnsupportedCurrency(_)
            | Self::MissingField(_)
            | Self::RejectionReasonRequired => ErrorCategory::Validation,

            Self::InvalidTransition { .. }
            | Self::NotEditable(_)
            | Self::DuplicateReceipt(_)
            | Self::DuplicateSubmission { .. } => ErrorCategory::Conflict,

            Self::NotFound(_) | Self::UserNotFound(_) | Self::DepartmentNotFound(_) => {
                ErrorCategory::NotFound
            }

            Self::NotAuthorized(_) => ErrorCategory::Forbidden,
            Self::Extraction(_) => ErrorCategory::ExternalService,
            Self::Ledger(_) | Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotEditable(_) => "EXPENSE_NOT_EDITABLE",
            Self::DuplicateReceipt(_) => "DUPLICATE_RECEIPT",
            Self::DuplicateSubmission { .. } => "DUPLICATE_EXPENSE",
            Self::NotFound(_) => "EXPENSE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::DepartmentNotFound(_) => "DEPARTMENT_NOT_FOUND",
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::Extraction(_) => "EXTRACTION_FAILED",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<ExpenseError> for AppError {
    fn from(err: ExpenseError) -> Self {
        Self::domain(err.category(), err.error_code(), err.to_string())
    }
}
