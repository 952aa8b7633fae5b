//! Application-wide error types.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Stable failure category shared by every domain error.
///
/// Callers branch on the category; the accompanying error code is finer
/// grained and the message is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid input. Nothing was mutated.
    Validation,
    /// A referenced user, department, report or expense does not exist.
    NotFound,
    /// Duplicate receipt, or an edit against a record in the wrong state.
    Conflict,
    /// The caller is not allowed to perform the action.
    Forbidden,
    /// The caller could not be identified.
    Unauthorized,
    /// Timeout or malformed response from an external service.
    ExternalService,
    /// One item of a batch failed; the rest of the batch continued.
    PartialBatch,
    /// Storage or other internal failure.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::PartialBatch => 207,
            Self::ExternalService => 502,
            Self::Internal => 500,
        }
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., duplicate receipt).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Error raised by a domain module, carrying its own stable code.
    #[error("{message}")]
    Domain {
        /// Failure category.
        category: ErrorCategory,
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a domain error from its parts.
    #[must_use]
    pub fn domain(category: ErrorCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self::Domain {
            category,
            code,
            message: message.into(),
        }
    }

    /// Returns the failure category for this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) => ErrorCategory::Unauthorized,
            Self::Forbidden(_) => ErrorCategory::Forbidden,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::ExternalService(_) => ErrorCategory::ExternalService,
            Self::Domain { category, .. } => *category,
            Self::Database(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Domain { code, .. } => code,
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
