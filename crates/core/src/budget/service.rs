//! Budget ledger service.
//!
//! Limits are only debited by approvals. Department spend is recomputed from
//! approved expenses on every call, never kept as a running counter.

use std::sync::Arc;

use expensa_shared::types::{DepartmentId, UserId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::error::BudgetError;
use super::types::{DepartmentUtilization, debit, remaining_pct};
use crate::store::{DepartmentStore, ExpenseStore, UserStore};

/// Tracks allotted limits and department utilization.
#[derive(Clone)]
pub struct BudgetLedger {
    users: Arc<dyn UserStore>,
    departments: Arc<dyn DepartmentStore>,
    expenses: Arc<dyn ExpenseStore>,
}

impl BudgetLedger {
    /// Creates a ledger over the given stores.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        departments: Arc<dyn DepartmentStore>,
        expenses: Arc<dyn ExpenseStore>,
    ) -> Self {
        Self {
            users,
            departments,
            expenses,
        }
    }

    /// Debits `amount` from the user's allotted limit and returns the new
    /// limit.
    ///
    /// The limit may go negative; that case is logged, not refused.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UserNotFound` or `BudgetError::LimitNotConfigured`
    /// when there is nothing to debit.
    pub async fn apply_approval(&self, user_id: UserId, amount: Decimal) -> Result<Decimal, BudgetError> {
        let user = self
            .users
            .find(user_id)
            .await?
            .ok_or(BudgetError::UserNotFound(user_id))?;
        let current = user
            .allotted_limit
            .ok_or(BudgetError::LimitNotConfigured(user_id))?;

        let new_limit = self.users.debit_limit(user_id, amount).await?;
        let expected = debit(current, amount);

        if new_limit < Decimal::ZERO {
            warn!(
                user_id = %user_id,
                amount = %amount,
                new_limit = %new_limit,
                "Allotted limit overdrawn by approval"
            );
        } else if new_limit != expected.new_limit {
            // Another debit landed between the read and the write.
            info!(
                user_id = %user_id,
                read_limit = %current,
                new_limit = %new_limit,
                "Allotted limit changed concurrently"
            );
        }

        Ok(new_limit)
    }

    /// Projects how much of a department's budget is consumed.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::DepartmentNotFound` if the department is missing.
    pub async fn project_department_utilization(
        &self,
        department_id: DepartmentId,
    ) -> Result<DepartmentUtilization, BudgetError> {
        let department = self
            .departments
            .find(department_id)
            .await?
            .ok_or(BudgetError::DepartmentNotFound(department_id))?;

        let members: Vec<UserId> = self
            .users
            .list_by_department(department_id)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        let spent = if members.is_empty() {
            Decimal::ZERO
        } else {
            self.expenses.approved_total(&members).await?
        };

        Ok(DepartmentUtilization {
            department_id,
            spent,
            allocated: department.total_budget,
            remaining_pct: remaining_pct(spent, department.total_budget),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::types::ExpenseState;
    use crate::testing::{MemoryStore, department, draft_expense, employee, set_state};
    use rust_decimal_macros::dec;

    fn ledger(store: &MemoryStore) -> BudgetLedger {
        let shared = Arc::new(store.clone());
        BudgetLedger::new(shared.clone(), shared.clone(), shared)
    }

    #[tokio::test]
    async fn test_apply_approval_debits_limit() {
        let store = MemoryStore::new();
        let user = employee(None, Some(dec!(500)));
        store.put_user(user.clone());

        let new_limit = ledger(&store).apply_approval(user.id, dec!(120)).await.unwrap();
        assert_eq!(new_limit, dec!(380));
        assert_eq!(store.user(user.id).unwrap().allotted_limit, Some(dec!(380)));
    }

    #[tokio::test]
    async fn test_apply_approval_allows_negative_limit() {
        let store = MemoryStore::new();
        let user = employee(None, Some(dec!(50)));
        store.put_user(user.clone());

        let new_limit = ledger(&store).apply_approval(user.id, dec!(80)).await.unwrap();
        assert_eq!(new_limit, dec!(-30));
    }

    #[tokio::test]
    async fn test_apply_approval_requires_configured_limit() {
        let store = MemoryStore::new();
        let user = employee(None, None);
        store.put_user(user.clone());

        let result = ledger(&store).apply_approval(user.id, dec!(10)).await;
        assert!(matches!(result, Err(BudgetError::LimitNotConfigured(_))));
    }

    #[tokio::test]
    async fn test_apply_approval_unknown_user() {
        let store = MemoryStore::new();
        let result = ledger(&store).apply_approval(UserId::new(), dec!(10)).await;
        assert!(matches!(result, Err(BudgetError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_utilization_sums_only_approved_member_expenses() {
        let store = MemoryStore::new();
        let dept = department("Engineering", dec!(1000));
        store.put_department(dept.clone());
        let member = employee(Some(dept.id), Some(dec!(500)));
        let outsider = employee(None, Some(dec!(500)));
        store.put_user(member.clone());
        store.put_user(outsider.clone());

        let mut approved = draft_expense(member.id, "Hotel", dec!(200));
        set_state(&mut approved, ExpenseState::Approved);
        let mut pending = draft_expense(member.id, "Cafe", dec!(50));
        set_state(&mut pending, ExpenseState::Pending);
        let mut foreign = draft_expense(outsider.id, "Taxi", dec!(75));
        set_state(&mut foreign, ExpenseState::Approved);
        store.put_expense(approved);
        store.put_expense(pending);
        store.put_expense(foreign);

        let utilization = ledger(&store)
            .project_department_utilization(dept.id)
            .await
            .unwrap();
        assert_eq!(utilization.spent, dec!(200));
        assert_eq!(utilization.allocated, dec!(1000));
        assert_eq!(utilization.remaining_pct, dec!(80.00));
    }

    #[tokio::test]
    async fn test_utilization_unknown_department() {
        let store = MemoryStore::new();
        let result = ledger(&store)
            .project_department_utilization(DepartmentId::new())
            .await;
        assert!(matches!(result, Err(BudgetError::DepartmentNotFound(_))));
    }
}
