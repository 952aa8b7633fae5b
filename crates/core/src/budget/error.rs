//! Budget ledger error types.

use expensa_shared::types::{DepartmentId, UserId};
use expensa_shared::{AppError, ErrorCategory};
use thiserror::Error;

use crate::store::StoreError;

/// Budget-related errors.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// User exists but has no allotted limit.
    #[error("User {0} has no allotted limit configured")]
    LimitNotConfigured(UserId),

    /// Department not found.
    #[error("Department not found: {0}")]
    DepartmentNotFound(DepartmentId),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl BudgetError {
    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UserNotFound(_) | Self::DepartmentNotFound(_) => ErrorCategory::NotFound,
            Self::LimitNotConfigured(_) => ErrorCategory::Validation,
            Self::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::LimitNotConfigured(_) => "LIMIT_NOT_CONFIGURED",
            Self::DepartmentNotFound(_) => "DEPARTMENT_NOT_FOUND",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        Self::domain(err.category(), err.error_code(), err.to_string())
    }
}
