//! Expense domain types.
//!
//! An expense carries two persisted status fields, submission and approval.
//! [`ExpenseState`] folds them into the single lifecycle the state machine
//! reasons about.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use expensa_shared::config::FALLBACK_CATEGORY;
use expensa_shared::types::{DepartmentId, ExpenseId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether the owner is still drafting the expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Owner may still edit or delete the expense.
    Draft,
    /// Handed to the approval process.
    Submitted,
}

impl SubmissionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

/// Approval decision for a submitted expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Provisionally approved by the engine, awaiting confirmation.
    AutoFlagged,
    /// Approved; the owner's limit has been debited.
    Approved,
    /// Rejected (terminal).
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AutoFlagged => "auto_flagged",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "auto_flagged" | "autoflagged" => Some(Self::AutoFlagged),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Lifecycle state of an expense.
///
/// The valid transitions are:
/// - Draft → Pending (submit)
/// - Pending → AutoFlagged (auto-approval fast track)
/// - Pending → Rejected (compliance check or manager)
/// - AutoFlagged → Approved (confirmation or manager)
/// - Pending → Approved (manager)
/// - AutoFlagged → Rejected (manager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseState {
    /// Being drafted by its owner.
    Draft,
    /// Submitted and awaiting a decision.
    Pending,
    /// Submitted and provisionally approved.
    AutoFlagged,
    /// Submitted and approved.
    Approved,
    /// Submitted and rejected.
    Rejected,
}

impl ExpenseState {
    /// Folds the two persisted status fields into a lifecycle state.
    ///
    /// A draft has no approval meaning, so its approval status is ignored.
    #[must_use]
    pub fn from_statuses(submission: SubmissionStatus, approval: ApprovalStatus) -> Self {
        match (submission, approval) {
            (SubmissionStatus::Draft, _) => Self::Draft,
            (SubmissionStatus::Submitted, ApprovalStatus::Pending) => Self::Pending,
            (SubmissionStatus::Submitted, ApprovalStatus::AutoFlagged) => Self::AutoFlagged,
            (SubmissionStatus::Submitted, ApprovalStatus::Approved) => Self::Approved,
            (SubmissionStatus::Submitted, ApprovalStatus::Rejected) => Self::Rejected,
        }
    }

    /// Splits the state back into persisted status fields.
    #[must_use]
    pub fn statuses(self) -> (SubmissionStatus, ApprovalStatus) {
        match self {
            Self::Draft => (SubmissionStatus::Draft, ApprovalStatus::Pending),
            Self::Pending => (SubmissionStatus::Submitted, ApprovalStatus::Pending),
            Self::AutoFlagged => (SubmissionStatus::Submitted, ApprovalStatus::AutoFlagged),
            Self::Approved => (SubmissionStatus::Submitted, ApprovalStatus::Approved),
            Self::Rejected => (SubmissionStatus::Submitted, ApprovalStatus::Rejected),
        }
    }

    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::AutoFlagged => "auto_flagged",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true if the owner may still change or delete the expense.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true once a final decision has been made.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only note attached to an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditComment {
    /// Who wrote the comment.
    pub author_id: UserId,
    /// Comment text.
    pub body: String,
    /// When it was written.
    pub created_at: DateTime<Utc>,
}

/// A single expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID.
    pub id: ExpenseId,
    /// Owning user.
    pub owner_id: UserId,
    /// Owner's department at intake time.
    pub department_id: Option<DepartmentId>,
    /// Denormalized department name.
    pub department_name: Option<String>,
    /// Merchant name.
    pub merchant: String,
    /// Amount in `currency`; always positive.
    pub amount: Decimal,
    /// Currency code from the supported set.
    pub currency: String,
    /// Category, normalized against the department's allowed list.
    pub category: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: Option<NaiveDate>,
    /// Hex SHA-256 of the receipt, when one was uploaded.
    pub fingerprint: Option<String>,
    /// Submission status.
    pub submission_status: SubmissionStatus,
    /// Approval status.
    pub approval_status: ApprovalStatus,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Audit comments, oldest first.
    pub comments: Vec<AuditComment>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Returns the lifecycle state of this expense.
    #[must_use]
    pub fn state(&self) -> ExpenseState {
        ExpenseState::from_statuses(self.submission_status, self.approval_status)
    }
}

/// User role in the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Submits expenses.
    Employee = 0,
    /// Decides on expenses of their department.
    Manager = 1,
    /// Decides on any expense.
    Admin = 2,
}

impl UserRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

/// A user as seen by the expense core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Role.
    pub role: UserRole,
    /// Department membership.
    pub department_id: Option<DepartmentId>,
    /// Remaining allotted spending limit; `None` when not configured.
    pub allotted_limit: Option<Decimal>,
}

impl User {
    /// Returns true if this user may decide on expenses of `department`.
    #[must_use]
    pub fn can_decide_for(&self, department: Option<DepartmentId>) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Manager => department.is_some() && self.department_id == department,
            UserRole::Employee => false,
        }
    }
}

/// A department and its spending policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    /// Department ID.
    pub id: DepartmentId,
    /// Department name.
    pub name: String,
    /// Managing user.
    pub manager_id: Option<UserId>,
    /// Total budget allocated to the department.
    pub total_budget: Decimal,
    /// Categories employees may file under.
    pub allowed_categories: Vec<String>,
}

impl Department {
    /// Normalizes a free-form category against the allowed list.
    ///
    /// Matching is case-insensitive and returns the department's spelling;
    /// anything unknown falls back to `Others`.
    #[must_use]
    pub fn normalize_category(&self, category: &str) -> String {
        normalize_category(&self.allowed_categories, category)
    }
}

/// Normalizes `category` against `allowed`, falling back to `Others`.
#[must_use]
pub fn normalize_category(allowed: &[String], category: &str) -> String {
    let wanted = category.trim();
    allowed
        .iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
        .cloned()
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}

/// Input for manual expense entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewExpense {
    /// Merchant name.
    pub merchant: String,
    /// Amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Free-form category.
    pub category: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: Option<NaiveDate>,
}

/// Partial update applied to a draft expense.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    /// New merchant name.
    pub merchant: Option<String>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New currency code.
    pub currency: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New expense date.
    pub expense_date: Option<NaiveDate>,
}

/// Filter for approved expenses feeding a report.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Owners whose expenses are included.
    pub owners: Vec<UserId>,
    /// First expense date included.
    pub from: Option<NaiveDate>,
    /// Last expense date included.
    pub to: Option<NaiveDate>,
    /// Categories included; empty means all.
    pub categories: Vec<String>,
}

impl ExpenseFilter {
    /// Returns true if `expense` is approved and within this filter.
    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        if expense.state() != ExpenseState::Approved {
            return false;
        }
        if !self.owners.contains(&expense.owner_id) {
            return false;
        }
        let Some(date) = expense.expense_date else {
            return false;
        };
        if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
            return false;
        }
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&expense.category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn department() -> Department {
        Department {
            id: DepartmentId::new(),
            name: "Engineering".to_string(),
            manager_id: None,
            total_budget: dec!(10000),
            allowed_categories: vec!["Travel".to_string(), "Meals".to_string()],
        }
    }

    #[test]
    fn test_state_from_statuses() {
        assert_eq!(
            ExpenseState::from_statuses(SubmissionStatus::Draft, ApprovalStatus::Approved),
            ExpenseState::Draft
        );
        assert_eq!(
            ExpenseState::from_statuses(SubmissionStatus::Submitted, ApprovalStatus::AutoFlagged),
            ExpenseState::AutoFlagged
        );
    }

    #[test]
    fn test_state_statuses_roundtrip() {
        for state in [
            ExpenseState::Draft,
            ExpenseState::Pending,
            ExpenseState::AutoFlagged,
            ExpenseState::Approved,
            ExpenseState::Rejected,
        ] {
            let (submission, approval) = state.statuses();
            assert_eq!(ExpenseState::from_statuses(submission, approval), state);
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            ApprovalStatus::parse("AUTO_FLAGGED"),
            Some(ApprovalStatus::AutoFlagged)
        );
        assert_eq!(SubmissionStatus::parse("Draft"), Some(SubmissionStatus::Draft));
        assert_eq!(ApprovalStatus::parse("posted"), None);
    }

    #[test]
    fn test_editable_only_in_draft() {
        assert!(ExpenseState::Draft.is_editable());
        assert!(!ExpenseState::Pending.is_editable());
        assert!(!ExpenseState::AutoFlagged.is_editable());
        assert!(ExpenseState::Rejected.is_resolved());
    }

    #[test]
    fn test_normalize_category_case_insensitive() {
        assert_eq!(department().normalize_category("  travel "), "Travel");
    }

    #[test]
    fn test_normalize_category_falls_back() {
        assert_eq!(department().normalize_category("Spa"), "Others");
    }

    #[test]
    fn test_role_ordering_and_parse() {
        assert!(UserRole::Employee < UserRole::Manager);
        assert!(UserRole::Manager < UserRole::Admin);
        assert_eq!(UserRole::parse("MANAGER"), Some(UserRole::Manager));
        assert_eq!(UserRole::parse("owner"), None);
    }

    #[test]
    fn test_manager_decides_only_for_own_department() {
        let dept = DepartmentId::new();
        let manager = User {
            id: UserId::new(),
            name: "M".to_string(),
            email: "m@example.com".to_string(),
            role: UserRole::Manager,
            department_id: Some(dept),
            allotted_limit: None,
        };
        assert!(manager.can_decide_for(Some(dept)));
        assert!(!manager.can_decide_for(Some(DepartmentId::new())));
        assert!(!manager.can_decide_for(None));

        let admin = User {
            role: UserRole::Admin,
            department_id: None,
            ..manager
        };
        assert!(admin.can_decide_for(None));
    }
}
