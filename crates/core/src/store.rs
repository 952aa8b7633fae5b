//! Persistence traits implemented by the database layer.
//!
//! Every status change goes through a conditional write keyed on the state
//! that was read, so two concurrent passes cannot both claim the same
//! expense or report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use expensa_shared::types::{DepartmentId, ExpenseId, PageRequest, ReportId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::aggregation::ExpenseSummary;
use crate::expense::types::{AuditComment, Department, Expense, ExpenseFilter, ExpenseState, User};
use crate::expense::workflow::ExpenseTransition;
use crate::reports::analysis::AnalysisSections;
use crate::reports::types::{Report, ReportListFilter};

/// Failure reported by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record the operation depends on does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A persisted value could not be mapped to a domain type.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The backend failed.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Expense persistence.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Inserts a new expense.
    async fn insert(&self, expense: &Expense) -> Result<(), StoreError>;

    /// Finds an expense by id.
    async fn find(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError>;

    /// Overwrites the editable fields of a draft. Returns false if the
    /// expense is gone or no longer a draft.
    async fn save_draft(&self, expense: &Expense) -> Result<bool, StoreError>;

    /// Deletes a draft. Returns false if the expense is gone or not a draft.
    async fn delete_draft(&self, id: ExpenseId) -> Result<bool, StoreError>;

    /// Finds any expense of `owner` with the given receipt fingerprint.
    async fn find_by_fingerprint(
        &self,
        owner: UserId,
        fingerprint: &str,
    ) -> Result<Option<Expense>, StoreError>;

    /// Finds an expense of `owner` with identical merchant and amount created
    /// at or after `since`.
    async fn find_recent_match(
        &self,
        owner: UserId,
        merchant: &str,
        amount: Decimal,
        since: DateTime<Utc>,
    ) -> Result<Option<Expense>, StoreError>;

    /// Lists every expense currently in `state`, oldest first.
    async fn list_in_state(&self, state: ExpenseState) -> Result<Vec<Expense>, StoreError>;

    /// Applies `transition` only if the expense is still in `expected`.
    /// Returns false when another writer got there first.
    async fn apply_transition(
        &self,
        id: ExpenseId,
        expected: ExpenseState,
        transition: &ExpenseTransition,
    ) -> Result<bool, StoreError>;

    /// Appends an audit comment.
    async fn append_comment(&self, id: ExpenseId, comment: &AuditComment)
    -> Result<bool, StoreError>;

    /// Approved expenses matching `filter`, newest expense date first.
    async fn find_approved(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError>;

    /// Sum of approved expense amounts owned by `owners`.
    async fn approved_total(&self, owners: &[UserId]) -> Result<Decimal, StoreError>;
}

/// User lookups and limit debits.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by id.
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Lists the members of a department.
    async fn list_by_department(&self, department: DepartmentId) -> Result<Vec<User>, StoreError>;

    /// Subtracts `amount` from the user's allotted limit in one write and
    /// returns the new limit. Fails with `NotFound` if the user is missing
    /// or has no configured limit.
    async fn debit_limit(&self, id: UserId, amount: Decimal) -> Result<Decimal, StoreError>;
}

/// Department lookups.
#[async_trait]
pub trait DepartmentStore: Send + Sync {
    /// Finds a department by id.
    async fn find(&self, id: DepartmentId) -> Result<Option<Department>, StoreError>;
}

/// Report persistence.
///
/// Status-changing writes only succeed while the report is still
/// generating, which keeps the status monotonic.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Inserts a new report shell.
    async fn insert(&self, report: &Report) -> Result<(), StoreError>;

    /// Finds a report by internal id.
    async fn find(&self, id: ReportId) -> Result<Option<Report>, StoreError>;

    /// Finds a report by its owner and external id.
    async fn find_by_external_id(
        &self,
        owner: UserId,
        external_id: &str,
    ) -> Result<Option<Report>, StoreError>;

    /// Stores the aggregation summary and included expense ids.
    async fn save_summary(
        &self,
        id: ReportId,
        summary: &ExpenseSummary,
        expense_ids: &[ExpenseId],
    ) -> Result<bool, StoreError>;

    /// Stores the analysis and marks the report completed, atomically.
    async fn complete(&self, id: ReportId, analysis: &AnalysisSections) -> Result<bool, StoreError>;

    /// Marks the report failed with a human-readable cause.
    async fn fail(&self, id: ReportId, cause: &str) -> Result<bool, StoreError>;

    /// Records where the rendered document was stored.
    async fn set_document(&self, id: ReportId, location: &str) -> Result<(), StoreError>;

    /// Records a render failure without touching the status.
    async fn set_render_error(&self, id: ReportId, message: &str) -> Result<(), StoreError>;

    /// Lists reports of `owner`, newest first, with the total match count.
    async fn list(
        &self,
        owner: UserId,
        filter: &ReportListFilter,
        page: PageRequest,
    ) -> Result<(Vec<Report>, u64), StoreError>;
}
