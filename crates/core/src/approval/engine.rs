//! Auto-approval batch and confirmation step.
//!
//! Each pending expense is evaluated on its own: the owner's limit is read,
//! a decision is made, and the resulting transition is written only if the
//! expense is still in the state that was read. A concurrent pass that got
//! there first makes the write a no-op and the expense is reported as
//! skipped.

use std::sync::Arc;
use std::time::Duration;

use expensa_shared::config::ApprovalConfig;
use expensa_shared::types::ExpenseId;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::compliance::{ComplianceRequest, ComplianceVerdict};
use super::error::{ApprovalError, BatchItemError};
use crate::ai::{LanguageModel, generate_with_timeout};
use crate::budget::BudgetLedger;
use crate::expense::types::{Expense, ExpenseState};
use crate::expense::workflow::{ExpenseTransition, ExpenseWorkflow};
use crate::store::{ExpenseStore, UserStore};

/// What the engine does with a pending expense before any external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Fast-track category within limit: flag for confirmation.
    FastTrack,
    /// Ask the compliance check.
    NeedsCompliance,
    /// Leave pending for a human.
    Hold,
}

/// Unattended approval rules.
#[derive(Debug, Clone)]
pub struct ApprovalPolicy {
    fast_track_categories: Vec<String>,
    auto_approval_enabled: bool,
    policy_document: String,
}

impl ApprovalPolicy {
    /// Builds the policy from configuration.
    #[must_use]
    pub fn from_config(config: &ApprovalConfig) -> Self {
        Self {
            fast_track_categories: config.fast_track_categories.clone(),
            auto_approval_enabled: config.auto_approval_enabled,
            policy_document: config.policy_document.clone(),
        }
    }

    /// Returns true if `category` is fast-tracked, ignoring case.
    #[must_use]
    pub fn is_fast_track(&self, category: &str) -> bool {
        self.fast_track_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }

    /// Decides the path for an expense given the owner's current limit.
    #[must_use]
    pub fn decide(&self, category: &str, amount: Decimal, limit: Decimal) -> Decision {
        if self.is_fast_track(category) && amount <= limit {
            Decision::FastTrack
        } else if self.auto_approval_enabled {
            Decision::NeedsCompliance
        } else {
            Decision::Hold
        }
    }

    /// The organizational policy text.
    #[must_use]
    pub fn policy_document(&self) -> &str {
        &self.policy_document
    }
}

/// Outcome of one evaluated expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Flagged,
    Rejected,
    StillPending,
    Skipped,
}

/// Result of an auto-approval pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoApprovalReport {
    /// Expenses moved to auto-flagged.
    pub flagged: Vec<ExpenseId>,
    /// Expenses rejected by the compliance check.
    pub rejected: Vec<ExpenseId>,
    /// Expenses left pending for a human.
    pub still_pending: Vec<ExpenseId>,
    /// Expenses another writer changed first.
    pub skipped: Vec<ExpenseId>,
    /// Per-expense failures.
    pub errors: Vec<BatchItemError>,
}

impl AutoApprovalReport {
    /// Number of expenses looked at.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.flagged.len()
            + self.rejected.len()
            + self.still_pending.len()
            + self.skipped.len()
            + self.errors.len()
    }

    fn record(&mut self, id: ExpenseId, outcome: Outcome) {
        match outcome {
            Outcome::Flagged => self.flagged.push(id),
            Outcome::Rejected => self.rejected.push(id),
            Outcome::StillPending => self.still_pending.push(id),
            Outcome::Skipped => self.skipped.push(id),
        }
    }
}

/// Result of a confirmation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmationReport {
    /// Expenses moved to approved.
    pub modified_count: u64,
    /// Per-expense failures.
    pub errors: Vec<BatchItemError>,
}

/// Runs the auto-approval batch and the confirmation step.
#[derive(Clone)]
pub struct AutoApprovalEngine {
    expenses: Arc<dyn ExpenseStore>,
    users: Arc<dyn UserStore>,
    ledger: BudgetLedger,
    model: Arc<dyn LanguageModel>,
    policy: ApprovalPolicy,
    timeout: Duration,
}

impl AutoApprovalEngine {
    /// Creates the engine.
    #[must_use]
    pub fn new(
        expenses: Arc<dyn ExpenseStore>,
        users: Arc<dyn UserStore>,
        ledger: BudgetLedger,
        model: Arc<dyn LanguageModel>,
        policy: ApprovalPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            expenses,
            users,
            ledger,
            model,
            policy,
            timeout,
        }
    }

    /// Evaluates every pending expense once.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Store` only if the pending set cannot be
    /// listed; per-expense failures are collected in the report.
    pub async fn run_batch(&self) -> Result<AutoApprovalReport, ApprovalError> {
        let pending = self.expenses.list_in_state(ExpenseState::Pending).await?;
        let mut report = AutoApprovalReport::default();

        for expense in &pending {
            match self.evaluate(expense).await {
                Ok(outcome) => report.record(expense.id, outcome),
                Err(e) => {
                    warn!(expense_id = %expense.id, error = %e, "Auto-approval failed for expense");
                    report.errors.push(BatchItemError::new(expense.id, &e));
                }
            }
        }

        info!(
            processed = report.processed(),
            flagged = report.flagged.len(),
            rejected = report.rejected.len(),
            still_pending = report.still_pending.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "Auto-approval pass finished"
        );
        Ok(report)
    }

    async fn evaluate(&self, expense: &Expense) -> Result<Outcome, ApprovalError> {
        let owner = self
            .users
            .find(expense.owner_id)
            .await?
            .ok_or(ApprovalError::OwnerNotFound(expense.owner_id))?;
        let limit = owner
            .allotted_limit
            .ok_or(ApprovalError::LimitNotConfigured(owner.id))?;

        match self.policy.decide(&expense.category, expense.amount, limit) {
            Decision::FastTrack => {
                let transition = ExpenseWorkflow::auto_flag(expense.state())?;
                self.claim(expense.id, &transition, Outcome::Flagged).await
            }
            Decision::Hold => Ok(Outcome::StillPending),
            Decision::NeedsCompliance => {
                let request = ComplianceRequest::for_expense(expense, limit)
                    .to_model_request(self.policy.policy_document());
                let text = generate_with_timeout(self.model.as_ref(), &request, self.timeout).await?;

                match ComplianceVerdict::parse(&text)? {
                    ComplianceVerdict::Compliant => Ok(Outcome::StillPending),
                    ComplianceVerdict::CompliantOverLimit => {
                        info!(
                            expense_id = %expense.id,
                            amount = %expense.amount,
                            limit = %limit,
                            "Compliant but over limit, left pending"
                        );
                        Ok(Outcome::StillPending)
                    }
                    ComplianceVerdict::Rejected(reason) => {
                        let transition = ExpenseWorkflow::reject_by_policy(expense.state(), reason)?;
                        self.claim(expense.id, &transition, Outcome::Rejected).await
                    }
                }
            }
        }
    }

    async fn claim(
        &self,
        id: ExpenseId,
        transition: &ExpenseTransition,
        outcome: Outcome,
    ) -> Result<Outcome, ApprovalError> {
        let applied = self
            .expenses
            .apply_transition(id, ExpenseState::Pending, transition)
            .await?;
        Ok(if applied { outcome } else { Outcome::Skipped })
    }

    /// Approves every auto-flagged expense and debits each owner's limit.
    ///
    /// Calling it again with no new auto-flagged expenses modifies nothing.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Store` only if the auto-flagged set cannot be
    /// listed.
    pub async fn confirm_auto_approvals(&self) -> Result<ConfirmationReport, ApprovalError> {
        let flagged = self.expenses.list_in_state(ExpenseState::AutoFlagged).await?;
        let mut report = ConfirmationReport::default();

        for expense in &flagged {
            match self.confirm_one(expense).await {
                Ok(true) => report.modified_count += 1,
                Ok(false) => {}
                Err((approved, e)) => {
                    if approved {
                        report.modified_count += 1;
                    }
                    warn!(expense_id = %expense.id, error = %e, "Confirmation failed for expense");
                    report.errors.push(BatchItemError::new(expense.id, &e));
                }
            }
        }

        info!(
            modified_count = report.modified_count,
            errors = report.errors.len(),
            "Auto-approval confirmation finished"
        );
        Ok(report)
    }

    /// Returns whether the expense was approved by this call. On error, the
    /// flag says whether the status had already changed.
    async fn confirm_one(&self, expense: &Expense) -> Result<bool, (bool, ApprovalError)> {
        let transition =
            ExpenseWorkflow::confirm(expense.state()).map_err(|e| (false, ApprovalError::from(e)))?;
        let applied = self
            .expenses
            .apply_transition(expense.id, ExpenseState::AutoFlagged, &transition)
            .await
            .map_err(|e| (false, ApprovalError::from(e)))?;
        if !applied {
            return Ok(false);
        }

        self.ledger
            .apply_approval(expense.owner_id, expense.amount)
            .await
            .map_err(|e| (true, ApprovalError::from(e)))?;
        Ok(true)
    }
}
