//! Report pipeline errors.

use chrono::NaiveDate;
use expensa_shared::{AppError, ErrorCategory};
use thiserror::Error;

use crate::store::StoreError;

/// Why a report ended as Failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The requester does not exist.
    RequesterNotFound,
    /// A team report was requested without a department.
    NoDepartment,
    /// The department does not exist.
    DepartmentNotFound,
    /// The requester may not report on the department.
    NotPermitted,
    /// No employee matched the scope.
    NoTargets,
    /// No approved expense matched the scope.
    NoExpenses,
    /// The analysis call failed or timed out.
    AnalysisUnavailable(String),
    /// The analysis response could not be parsed.
    AnalysisParse(String),
    /// A store read or write failed mid-run.
    Storage(String),
}

impl From<StoreError> for FailureReason {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl FailureReason {
    /// Human-readable cause stored on the report.
    #[must_use]
    pub fn cause(&self) -> String {
        match self {
            Self::RequesterNotFound => "requester not found".to_string(),
            Self::NoDepartment => "requester has no department".to_string(),
            Self::DepartmentNotFound => "department not found".to_string(),
            Self::NotPermitted => "team reports require a manager or admin".to_string(),
            Self::NoTargets => "no matching employees".to_string(),
            Self::NoExpenses => "no expenses found".to_string(),
            Self::AnalysisUnavailable(detail) => format!("analysis service unavailable: {detail}"),
            Self::AnalysisParse(_) => "failed to parse analysis response".to_string(),
            Self::Storage(detail) => format!("storage failure: {detail}"),
        }
    }

    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RequesterNotFound | Self::DepartmentNotFound | Self::NoTargets | Self::NoExpenses => {
                ErrorCategory::NotFound
            }
            Self::NoDepartment => ErrorCategory::Validation,
            Self::NotPermitted => ErrorCategory::Forbidden,
            Self::AnalysisUnavailable(_) | Self::AnalysisParse(_) => ErrorCategory::ExternalService,
            Self::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RequesterNotFound => "REQUESTER_NOT_FOUND",
            Self::NoDepartment => "NO_DEPARTMENT",
            Self::DepartmentNotFound => "DEPARTMENT_NOT_FOUND",
            Self::NotPermitted => "REPORT_NOT_PERMITTED",
            Self::NoTargets => "NO_MATCHING_EMPLOYEES",
            Self::NoExpenses => "NO_EXPENSES_FOUND",
            Self::AnalysisUnavailable(_) => "ANALYSIS_UNAVAILABLE",
            Self::AnalysisParse(_) => "ANALYSIS_PARSE_FAILED",
            Self::Storage(_) => "REPORT_STORAGE_FAILED",
        }
    }
}

/// Report errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Only one of `from` and `to` was given.
    #[error("Both from and to are required when either is given")]
    MissingRangeBound,

    /// `from` is after `to`.
    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange {
        /// First day.
        from: NaiveDate,
        /// Last day.
        to: NaiveDate,
    },

    /// The pipeline stopped and the report was marked Failed.
    #[error("Report {external_id} failed: {}", reason.cause())]
    Failed {
        /// The failed report's external id.
        external_id: String,
        /// Why it failed.
        reason: FailureReason,
    },

    /// Report not found.
    #[error("Report {0} not found")]
    NotFound(String),

    /// The report was settled by another writer before this run finished.
    #[error("Report {0} is no longer generating")]
    StatusConflict(String),

    /// The rendered document is not available yet.
    #[error("Document for report {0} is not available")]
    DocumentUnavailable(String),

    /// Document storage failure.
    #[error("Document storage error: {0}")]
    Storage(String),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ReportError {
    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingRangeBound | Self::InvalidRange { .. } => ErrorCategory::Validation,
            Self::Failed { reason, .. } => reason.category(),
            Self::NotFound(_) | Self::DocumentUnavailable(_) => ErrorCategory::NotFound,
            Self::StatusConflict(_) => ErrorCategory::Conflict,
            Self::Storage(_) | Self::Store(_) => ErrorCategory::Internal,
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
            Self::MissingRangeBound => "MISSING_RANGE_BOUND",
            Self::InvalidRange { .. } => "INVALID_DATE_RANGE",
            Self::Failed { reason, .. } => reason.error_code(),
            Self::NotFound(_) => "REPORT_NOT_FOUND",
            Self::StatusConflict(_) => "REPORT_STATUS_CONFLICT",
            Self::DocumentUnavailable(_) => "DOCUMENT_NOT_AVAILABLE",
            Self::Storage(_) => "DOCUMENT_STORAGE_ERROR",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        Self::domain(err.category(), err.error_code(), err.to_string())
    }
}
