//! Expense state machine.
//!
//! Validates lifecycle transitions and returns an [`ExpenseTransition`]
//! carrying the audit data to persist. Nothing here touches storage.

use chrono::{DateTime, Utc};
use expensa_shared::types::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::expense::error::ExpenseError;
use crate::expense::types::{Expense, ExpenseState};

/// Who approved an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalSource {
    /// Confirmation of an auto-flagged expense.
    Confirmation,
    /// Direct manager or admin decision.
    Manager,
}

/// A validated state transition with audit data.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseTransition {
    /// Draft handed to the approval process.
    Submit {
        /// The user who submitted the expense.
        submitted_by: UserId,
        /// When the expense was submitted.
        submitted_at: DateTime<Utc>,
    },
    /// Fast-tracked by the auto-approval engine.
    AutoFlag {
        /// When the expense was flagged.
        flagged_at: DateTime<Utc>,
    },
    /// Approved; the owner's limit must be debited.
    Approve {
        /// Deciding user, `None` for the confirmation step.
        approved_by: Option<UserId>,
        /// When the expense was approved.
        approved_at: DateTime<Utc>,
        /// Path that led to approval.
        source: ApprovalSource,
    },
    /// Rejected with a reason.
    Reject {
        /// Deciding user, `None` for the compliance check.
        rejected_by: Option<UserId>,
        /// When the expense was rejected.
        rejected_at: DateTime<Utc>,
        /// The reason for rejection.
        reason: String,
    },
}

impl ExpenseTransition {
    /// Returns the state the expense ends up in.
    #[must_use]
    pub fn target(&self) -> ExpenseState {
        match self {
            Self::Submit { .. } => ExpenseState::Pending,
            Self::AutoFlag { .. } => ExpenseState::AutoFlagged,
            Self::Approve { .. } => ExpenseState::Approved,
            Self::Reject { .. } => ExpenseState::Rejected,
        }
    }

    /// Returns when the transition happened.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Submit { submitted_at, .. } => *submitted_at,
            Self::AutoFlag { flagged_at } => *flagged_at,
            Self::Approve { approved_at, .. } => *approved_at,
            Self::Reject { rejected_at, .. } => *rejected_at,
        }
    }

    /// Returns the rejection reason, if this is a rejection.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Reject { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Applies the transition to an in-memory expense.
    pub fn apply_to(&self, expense: &mut Expense) {
        let (submission, approval) = self.target().statuses();
        expense.submission_status = submission;
        expense.approval_status = approval;
        if let Some(reason) = self.rejection_reason() {
            expense.rejection_reason = Some(reason.to_string());
        }
        expense.updated_at = self.occurred_at();
    }
}

/// Stateless service for expense lifecycle transitions.
pub struct ExpenseWorkflow;

impl ExpenseWorkflow {
    /// Submit a draft expense.
    ///
    /// # Errors
    /// * `ExpenseError::InvalidTransition` if the expense is not a draft
    /// * `ExpenseError::MissingField` if merchant, currency or date is missing
    /// * `ExpenseError::InvalidAmount` if the amount is not positive
    pub fn submit(expense: &Expense, submitted_by: UserId) -> Result<ExpenseTransition, ExpenseError> {
        let current = expense.state();
        if current != ExpenseState::Draft {
            return Err(ExpenseError::InvalidTransition {
                from: current,
                to: ExpenseState::Pending,
            });
        }

        if expense.merchant.trim().is_empty() {
            return Err(ExpenseError::MissingField("merchant"));
        }
        if expense.amount <= Decimal::ZERO {
            return Err(ExpenseError::InvalidAmount(expense.amount));
        }
        if expense.currency.trim().is_empty() {
            return Err(ExpenseError::MissingField("currency"));
        }
        if expense.expense_date.is_none() {
            return Err(ExpenseError::MissingField("expense_date"));
        }

        Ok(ExpenseTransition::Submit {
            submitted_by,
            submitted_at: Utc::now(),
        })
    }

    /// Ensure the expense may still be edited or deleted by its owner.
    pub fn ensure_editable(current: ExpenseState) -> Result<(), ExpenseError> {
        if current.is_editable() {
            Ok(())
        } else {
            Err(ExpenseError::NotEditable(current))
        }
    }

    /// Fast-track a pending expense.
    pub fn auto_flag(current: ExpenseState) -> Result<ExpenseTransition, ExpenseError> {
        match current {
            ExpenseState::Pending => Ok(ExpenseTransition::AutoFlag {
                flagged_at: Utc::now(),
            }),
            _ => Err(ExpenseError::InvalidTransition {
                from: current,
                to: ExpenseState::AutoFlagged,
            }),
        }
    }

    /// Reject a pending expense on the compliance check's verdict.
    pub fn reject_by_policy(
        current: ExpenseState,
        reason: String,
    ) -> Result<ExpenseTransition, ExpenseError> {
        Self::reject_from(current, &[ExpenseState::Pending], None, reason)
    }

    /// Confirm an auto-flagged expense.
    pub fn confirm(current: ExpenseState) -> Result<ExpenseTransition, ExpenseError> {
        match current {
            ExpenseState::AutoFlagged => Ok(ExpenseTransition::Approve {
                approved_by: None,
                approved_at: Utc::now(),
                source: ApprovalSource::Confirmation,
            }),
            _ => Err(ExpenseError::InvalidTransition {
                from: current,
                to: ExpenseState::Approved,
            }),
        }
    }

    /// Approve a pending or auto-flagged expense by manager decision.
    pub fn manager_approve(
        current: ExpenseState,
        approved_by: UserId,
    ) -> Result<ExpenseTransition, ExpenseError> {
        match current {
            ExpenseState::Pending | ExpenseState::AutoFlagged => Ok(ExpenseTransition::Approve {
                approved_by: Some(approved_by),
                approved_at: Utc::now(),
                source: ApprovalSource::Manager,
            }),
            _ => Err(ExpenseError::InvalidTransition {
                from: current,
                to: ExpenseState::Approved,
            }),
        }
    }

    /// Reject a pending or auto-flagged expense by manager decision.
    ///
    /// # Errors
    /// * `ExpenseError::RejectionReasonRequired` if the reason is blank
    pub fn manager_reject(
        current: ExpenseState,
        rejected_by: UserId,
        reason: String,
    ) -> Result<ExpenseTransition, ExpenseError> {
        Self::reject_from(
            current,
            &[ExpenseState::Pending, ExpenseState::AutoFlagged],
            Some(rejected_by),
            reason,
        )
    }

    fn reject_from(
        current: ExpenseState,
        allowed: &[ExpenseState],
        rejected_by: Option<UserId>,
        reason: String,
    ) -> Result<ExpenseTransition, ExpenseError> {
        if reason.trim().is_empty() {
            return Err(ExpenseError::RejectionReasonRequired);
        }

        if allowed.contains(&current) {
            Ok(ExpenseTransition::Reject {
                rejected_by,
                rejected_at: Utc::now(),
                reason,
            })
        } else {
            Err(ExpenseError::InvalidTransition {
                from: current,
                to: ExpenseState::Rejected,
            })
        }
    }

    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: ExpenseState, to: ExpenseState) -> bool {
        matches!(
            (from, to),
            (ExpenseState::Draft, ExpenseState::Pending)
                | (
                    ExpenseState::Pending,
                    ExpenseState::AutoFlagged | ExpenseState::Approved | ExpenseState::Rejected
                )
                | (
                    ExpenseState::AutoFlagged,
                    ExpenseState::Approved | ExpenseState::Rejected
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::draft_expense;
    use rust_decimal_macros::dec;

    #[test]
    fn test_submit_from_draft() {
        let expense = draft_expense(UserId::new(), "Cafe", dec!(12.50));
        let action = ExpenseWorkflow::submit(&expense, expense.owner_id).unwrap();
        assert_eq!(action.target(), ExpenseState::Pending);
    }

    #[test]
    fn test_submit_requires_date() {
        let mut expense = draft_expense(UserId::new(), "Cafe", dec!(12.50));
        expense.expense_date = None;
        assert!(matches!(
            ExpenseWorkflow::submit(&expense, expense.owner_id),
            Err(ExpenseError::MissingField("expense_date"))
        ));
    }

    #[test]
    fn test_submit_requires_merchant() {
        let expense = draft_expense(UserId::new(), "   ", dec!(12.50));
        assert!(matches!(
            ExpenseWorkflow::submit(&expense, expense.owner_id),
            Err(ExpenseError::MissingField("merchant"))
        ));
    }

    #[test]
    fn test_submit_from_non_draft_fails() {
        let mut expense = draft_expense(UserId::new(), "Cafe", dec!(12.50));
        ExpenseTransition::Submit {
            submitted_by: expense.owner_id,
            submitted_at: Utc::now(),
        }
        .apply_to(&mut expense);
        assert!(matches!(
            ExpenseWorkflow::submit(&expense, expense.owner_id),
            Err(ExpenseError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_ensure_editable() {
        assert!(ExpenseWorkflow::ensure_editable(ExpenseState::Draft).is_ok());
        assert!(matches!(
            ExpenseWorkflow::ensure_editable(ExpenseState::Pending),
            Err(ExpenseError::NotEditable(ExpenseState::Pending))
        ));
    }

    #[test]
    fn test_auto_flag_only_from_pending() {
        assert!(ExpenseWorkflow::auto_flag(ExpenseState::Pending).is_ok());
        assert!(ExpenseWorkflow::auto_flag(ExpenseState::Draft).is_err());
        assert!(ExpenseWorkflow::auto_flag(ExpenseState::AutoFlagged).is_err());
    }

    #[test]
    fn test_confirm_only_from_auto_flagged() {
        let action = ExpenseWorkflow::confirm(ExpenseState::AutoFlagged).unwrap();
        assert!(matches!(
            action,
            ExpenseTransition::Approve {
                approved_by: None,
                source: ApprovalSource::Confirmation,
                ..
            }
        ));
        assert!(ExpenseWorkflow::confirm(ExpenseState::Pending).is_err());
        assert!(ExpenseWorkflow::confirm(ExpenseState::Approved).is_err());
    }

    #[test]
    fn test_manager_reject_requires_reason() {
        let result = ExpenseWorkflow::manager_reject(ExpenseState::Pending, UserId::new(), "  ".into());
        assert!(matches!(result, Err(ExpenseError::RejectionReasonRequired)));
    }

    #[test]
    fn test_rejected_is_terminal() {
        let manager = UserId::new();
        assert!(ExpenseWorkflow::manager_approve(ExpenseState::Rejected, manager).is_err());
        assert!(
            ExpenseWorkflow::manager_reject(ExpenseState::Rejected, manager, "again".into())
                .is_err()
        );
    }

    #[test]
    fn test_policy_reject_only_from_pending() {
        assert!(ExpenseWorkflow::reject_by_policy(ExpenseState::Pending, "alcohol".into()).is_ok());
        assert!(
            ExpenseWorkflow::reject_by_policy(ExpenseState::AutoFlagged, "alcohol".into()).is_err()
        );
    }

    #[test]
    fn test_apply_rejection_records_reason() {
        let mut expense = draft_expense(UserId::new(), "Bar", dec!(80));
        let action = ExpenseTransition::Reject {
            rejected_by: None,
            rejected_at: Utc::now(),
            reason: "Alcohol is not reimbursable".into(),
        };
        action.apply_to(&mut expense);
        assert_eq!(expense.state(), ExpenseState::Rejected);
        assert_eq!(
            expense.rejection_reason.as_deref(),
            Some("Alcohol is not reimbursable")
        );
    }

    #[test]
    fn test_is_valid_transition() {
        assert!(ExpenseWorkflow::is_valid_transition(
            ExpenseState::Draft,
            ExpenseState::Pending
        ));
        assert!(ExpenseWorkflow::is_valid_transition(
            ExpenseState::AutoFlagged,
            ExpenseState::Approved
        ));
        assert!(!ExpenseWorkflow::is_valid_transition(
            ExpenseState::Draft,
            ExpenseState::Approved
        ));
        assert!(!ExpenseWorkflow::is_valid_transition(
            ExpenseState::Rejected,
            ExpenseState::Approved
        ));
        assert!(!ExpenseWorkflow::is_valid_transition(
            ExpenseState::Approved,
            ExpenseState::Pending
        ));
    }
}
