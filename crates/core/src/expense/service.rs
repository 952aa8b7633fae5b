//! Expense intake, draft editing and manual decisions.
//!
//! Intake is a sequence of result-returning stages:
//! fingerprint → extraction → validation → duplicate check → persist.
//! Each stage either feeds the next or stops with a typed error, and
//! nothing is written until every stage has passed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use expensa_shared::config::{ApprovalConfig, FALLBACK_CATEGORY};
use expensa_shared::types::{ExpenseId, UserId};
use tracing::{error, info};

use crate::ai::LanguageModel;
use crate::budget::BudgetLedger;
use crate::expense::duplicate::{DuplicateDetector, fingerprint};
use crate::expense::error::ExpenseError;
use crate::expense::intake::{ReceiptUpload, extract_receipt};
use crate::expense::types::{
    ApprovalStatus, AuditComment, Expense, ExpenseState, ExpenseUpdate, NewExpense,
    SubmissionStatus, User, normalize_category,
};
use crate::expense::validation::validate_fields;
use crate::expense::workflow::{ExpenseTransition, ExpenseWorkflow};
use crate::store::{DepartmentStore, ExpenseStore, UserStore};

/// Stores the expense service works against.
#[derive(Clone)]
pub struct ExpenseStores {
    /// Expense records.
    pub expenses: Arc<dyn ExpenseStore>,
    /// Users.
    pub users: Arc<dyn UserStore>,
    /// Departments.
    pub departments: Arc<dyn DepartmentStore>,
}

/// Expense lifecycle operations driven by users.
#[derive(Clone)]
pub struct ExpenseService {
    stores: ExpenseStores,
    detector: DuplicateDetector,
    ledger: BudgetLedger,
    model: Arc<dyn LanguageModel>,
    supported_currencies: Vec<String>,
    extraction_timeout: Duration,
}

impl ExpenseService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        stores: ExpenseStores,
        model: Arc<dyn LanguageModel>,
        approval: &ApprovalConfig,
        extraction_timeout: Duration,
    ) -> Self {
        let detector = DuplicateDetector::new(
            stores.expenses.clone(),
            approval.duplicate_window_hours,
        );
        let ledger = BudgetLedger::new(
            stores.users.clone(),
            stores.departments.clone(),
            stores.expenses.clone(),
        );
        Self {
            stores,
            detector,
            ledger,
            model,
            supported_currencies: approval.supported_currencies.clone(),
            extraction_timeout,
        }
    }

    /// Files a manually entered expense as a draft.
    pub async fn create(&self, owner_id: UserId, input: NewExpense) -> Result<Expense, ExpenseError> {
        self.create_draft(owner_id, input, None).await
    }

    /// Files an expense read from an uploaded receipt as a draft.
    pub async fn create_from_receipt(
        &self,
        owner_id: UserId,
        upload: ReceiptUpload,
    ) -> Result<Expense, ExpenseError> {
        let fp = fingerprint(&upload.bytes);
        let receipt = extract_receipt(self.model.as_ref(), &upload, self.extraction_timeout).await?;
        let input = receipt.into_new_expense()?;
        self.create_draft(owner_id, input, Some(fp)).await
    }

    async fn create_draft(
        &self,
        owner_id: UserId,
        input: NewExpense,
        fp: Option<String>,
    ) -> Result<Expense, ExpenseError> {
        let currency = validate_fields(
            &input.merchant,
            input.amount,
            &input.currency,
            &self.supported_currencies,
        )?;
        let merchant = input.merchant.trim().to_string();

        let owner = self.find_user(owner_id).await?;
        let (department_name, category) = self.resolve_category(&owner, input.category.as_deref()).await?;

        let now = Utc::now();
        if let Some(found) = self
            .detector
            .find_duplicate(owner_id, fp.as_deref(), &merchant, input.amount, now)
            .await
        {
            info!(
                owner_id = %owner_id,
                existing = %found.existing(),
                "Rejected duplicate expense"
            );
            return Err(found.into_error(&merchant, input.amount));
        }

        let expense = Expense {
            id: ExpenseId::new(),
            owner_id,
            department_id: owner.department_id,
            department_name,
            merchant,
            amount: input.amount,
            currency,
            category,
            description: input.description,
            expense_date: input.expense_date,
            fingerprint: fp,
            submission_status: SubmissionStatus::Draft,
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.stores.expenses.insert(&expense).await?;
        info!(expense_id = %expense.id, owner_id = %owner_id, "Expense drafted");
        Ok(expense)
    }

    /// Applies a partial update to a draft owned by `actor`.
    pub async fn update_draft(
        &self,
        actor: UserId,
        id: ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<Expense, ExpenseError> {
        let mut expense = self.find_owned(actor, id).await?;
        ExpenseWorkflow::ensure_editable(expense.state())?;

        if let Some(merchant) = update.merchant {
            expense.merchant = merchant.trim().to_string();
        }
        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(currency) = update.currency {
            expense.currency = currency;
        }
        if let Some(description) = update.description {
            expense.description = Some(description);
        }
        if let Some(date) = update.expense_date {
            expense.expense_date = Some(date);
        }
        if let Some(category) = update.category {
            let owner = self.find_user(expense.owner_id).await?;
            expense.category = self.resolve_category(&owner, Some(&category)).await?.1;
        }

        expense.currency = validate_fields(
            &expense.merchant,
            expense.amount,
            &expense.currency,
            &self.supported_currencies,
        )?;
        expense.updated_at = Utc::now();

        if !self.stores.expenses.save_draft(&expense).await? {
            return Err(self.lost_race(id, ExpenseState::Draft).await);
        }
        Ok(expense)
    }

    /// Deletes a draft owned by `actor`.
    pub async fn delete_draft(&self, actor: UserId, id: ExpenseId) -> Result<(), ExpenseError> {
        let expense = self.find_owned(actor, id).await?;
        ExpenseWorkflow::ensure_editable(expense.state())?;

        if !self.stores.expenses.delete_draft(id).await? {
            return Err(self.lost_race(id, ExpenseState::Draft).await);
        }
        info!(expense_id = %id, "Draft deleted");
        Ok(())
    }

    /// Submits a draft owned by `actor` for approval.
    pub async fn submit(&self, actor: UserId, id: ExpenseId) -> Result<Expense, ExpenseError> {
        let mut expense = self.find_owned(actor, id).await?;
        let transition = ExpenseWorkflow::submit(&expense, actor)?;
        self.commit(&mut expense, ExpenseState::Draft, &transition).await?;
        info!(expense_id = %id, "Expense submitted");
        Ok(expense)
    }

    /// Fetches an expense.
    pub async fn get(&self, id: ExpenseId) -> Result<Expense, ExpenseError> {
        self.stores
            .expenses
            .find(id)
            .await?
            .ok_or(ExpenseError::NotFound(id))
    }

    /// Appends an audit comment. Allowed in every state.
    pub async fn add_comment(
        &self,
        author_id: UserId,
        id: ExpenseId,
        body: String,
    ) -> Result<AuditComment, ExpenseError> {
        if body.trim().is_empty() {
            return Err(ExpenseError::MissingField("body"));
        }
        self.find_user(author_id).await?;

        let comment = AuditComment {
            author_id,
            body: body.trim().to_string(),
            created_at: Utc::now(),
        };
        if !self.stores.expenses.append_comment(id, &comment).await? {
            return Err(ExpenseError::NotFound(id));
        }
        Ok(comment)
    }

    /// Approves a pending or auto-flagged expense and debits the owner's
    /// limit.
    pub async fn approve(&self, actor_id: UserId, id: ExpenseId) -> Result<Expense, ExpenseError> {
        let (actor, mut expense) = self.decision_context(actor_id, id).await?;
        let from = expense.state();
        let transition = ExpenseWorkflow::manager_approve(from, actor.id)?;
        self.commit(&mut expense, from, &transition).await?;

        if let Err(e) = self.ledger.apply_approval(expense.owner_id, expense.amount).await {
            error!(
                expense_id = %id,
                owner_id = %expense.owner_id,
                error = %e,
                "Expense approved but limit debit failed"
            );
            return Err(ExpenseError::Ledger(e.to_string()));
        }

        info!(expense_id = %id, approved_by = %actor.id, "Expense approved");
        Ok(expense)
    }

    /// Rejects a pending or auto-flagged expense with a reason.
    pub async fn reject(
        &self,
        actor_id: UserId,
        id: ExpenseId,
        reason: String,
    ) -> Result<Expense, ExpenseError> {
        let (actor, mut expense) = self.decision_context(actor_id, id).await?;
        let from = expense.state();
        let transition = ExpenseWorkflow::manager_reject(from, actor.id, reason)?;
        self.commit(&mut expense, from, &transition).await?;
        info!(expense_id = %id, rejected_by = %actor.id, "Expense rejected");
        Ok(expense)
    }

    async fn decision_context(
        &self,
        actor_id: UserId,
        id: ExpenseId,
    ) -> Result<(User, Expense), ExpenseError> {
        let actor = self.find_user(actor_id).await?;
        let expense = self.get(id).await?;
        if !actor.can_decide_for(expense.department_id) {
            return Err(ExpenseError::NotAuthorized(actor_id));
        }
        Ok((actor, expense))
    }

    async fn commit(
        &self,
        expense: &mut Expense,
        expected: ExpenseState,
        transition: &ExpenseTransition,
    ) -> Result<(), ExpenseError> {
        if !self
            .stores
            .expenses
            .apply_transition(expense.id, expected, transition)
            .await?
        {
            return Err(self.lost_race(expense.id, transition.target()).await);
        }
        transition.apply_to(expense);
        Ok(())
    }

    /// Builds the conflict returned when a conditional write lost.
    async fn lost_race(&self, id: ExpenseId, wanted: ExpenseState) -> ExpenseError {
        match self.stores.expenses.find(id).await {
            Ok(Some(current)) if wanted == ExpenseState::Draft => {
                ExpenseError::NotEditable(current.state())
            }
            Ok(Some(current)) => ExpenseError::InvalidTransition {
                from: current.state(),
                to: wanted,
            },
            Ok(None) => ExpenseError::NotFound(id),
            Err(e) => ExpenseError::Store(e),
        }
    }

    async fn find_owned(&self, actor: UserId, id: ExpenseId) -> Result<Expense, ExpenseError> {
        let expense = self.get(id).await?;
        if expense.owner_id != actor {
            return Err(ExpenseError::NotAuthorized(actor));
        }
        Ok(expense)
    }

    async fn find_user(&self, id: UserId) -> Result<User, ExpenseError> {
        self.stores
            .users
            .find(id)
            .await?
            .ok_or(ExpenseError::UserNotFound(id))
    }

    /// Returns the owner's department name and the normalized category.
    async fn resolve_category(
        &self,
        owner: &User,
        category: Option<&str>,
    ) -> Result<(Option<String>, String), ExpenseError> {
        let requested = category.unwrap_or(FALLBACK_CATEGORY);
        let Some(department_id) = owner.department_id else {
            return Ok((None, normalize_category(&[FALLBACK_CATEGORY.to_string()], requested)));
        };

        let department = self
            .stores
            .departments
            .find(department_id)
            .await?
            .ok_or(ExpenseError::DepartmentNotFound(department_id))?;
        Ok((
            Some(department.name.clone()),
            department.normalize_category(requested),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, ScriptedModel, department, employee, manager};
    use chrono::NaiveDate;
    use expensa_shared::types::DepartmentId;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: MemoryStore,
        service: ExpenseService,
        owner: User,
    }

    fn fixture_with_model(model: ScriptedModel) -> Fixture {
        let store = MemoryStore::new();
        let dept = department("Engineering", dec!(10000));
        store.put_department(dept.clone());
        let owner = employee(Some(dept.id), Some(dec!(500)));
        store.put_user(owner.clone());

        let shared = Arc::new(store.clone());
        let stores = ExpenseStores {
            expenses: shared.clone(),
            users: shared.clone(),
            departments: shared,
        };
        let service = ExpenseService::new(
            stores,
            Arc::new(model),
            &ApprovalConfig::default(),
            Duration::from_secs(5),
        );
        Fixture {
            store,
            service,
            owner,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_model(ScriptedModel::new(Vec::<String>::new()))
    }

    fn lunch() -> NewExpense {
        NewExpense {
            merchant: "Blue Cafe".to_string(),
            amount: dec!(18.40),
            currency: "usd".to_string(),
            category: Some("meals".to_string()),
            description: Some("Team lunch".to_string()),
            expense_date: NaiveDate::from_ymd_opt(2026, 10, 2),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_persists_draft() {
        let f = fixture();
        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();

        assert_eq!(expense.state(), ExpenseState::Draft);
        assert_eq!(expense.currency, "USD");
        assert_eq!(expense.category, "Meals");
        assert_eq!(expense.department_name.as_deref(), Some("Engineering"));
        assert!(f.store.expense(expense.id).is_some());
    }

    #[tokio::test]
    async fn test_unknown_category_falls_back_to_others() {
        let f = fixture();
        let mut input = lunch();
        input.category = Some("Spa".to_string());
        let expense = f.service.create(f.owner.id, input).await.unwrap();
        assert_eq!(expense.category, "Others");
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_persisted() {
        let f = fixture();
        let mut input = lunch();
        input.amount = dec!(0);
        let err = f.service.create(f.owner.id, input).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AMOUNT");

        let mut input = lunch();
        input.currency = "XYZ".to_string();
        let err = f.service.create(f.owner.id, input).await.unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CURRENCY");
        assert_eq!(f.store.expense_count(), 0);
    }

    #[tokio::test]
    async fn test_same_merchant_amount_twice_is_conflict() {
        let f = fixture();
        f.service.create(f.owner.id, lunch()).await.unwrap();
        let err = f.service.create(f.owner.id, lunch()).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "DUPLICATE_EXPENSE");
        assert_eq!(f.store.expense_count(), 1);
    }

    #[tokio::test]
    async fn test_same_receipt_twice_is_conflict() {
        let reading = "{\"merchant\": \"Hotel Nord\", \"amount\": 240, \"currency\": \"EUR\", \
                       \"date\": \"2026-09-30\", \"category\": \"Travel\"}";
        let second = "{\"merchant\": \"Hotel Nord Berlin\", \"amount\": 241, \"currency\": \"EUR\", \
                      \"date\": \"2026-09-30\", \"category\": \"Travel\"}";
        let f = fixture_with_model(ScriptedModel::new([reading, second]));
        let upload = ReceiptUpload {
            bytes: b"same-receipt-bytes".to_vec(),
            mime_type: "application/pdf".to_string(),
        };

        let first = f
            .service
            .create_from_receipt(f.owner.id, upload.clone())
            .await
            .unwrap();
        assert_eq!(first.fingerprint, Some(fingerprint(b"same-receipt-bytes")));

        let err = f
            .service
            .create_from_receipt(f.owner.id, upload)
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::DuplicateReceipt(id) if id == first.id));
    }

    #[tokio::test]
    async fn test_update_and_delete_only_while_draft() {
        let f = fixture();
        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();

        let updated = f
            .service
            .update_draft(
                f.owner.id,
                expense.id,
                ExpenseUpdate {
                    amount: Some(dec!(20)),
                    ..ExpenseUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount, dec!(20));

        f.service.submit(f.owner.id, expense.id).await.unwrap();

        let err = f
            .service
            .update_draft(f.owner.id, expense.id, ExpenseUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::NotEditable(ExpenseState::Pending)));

        let err = f.service.delete_draft(f.owner.id, expense.id).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_delete_draft() {
        let f = fixture();
        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();
        f.service.delete_draft(f.owner.id, expense.id).await.unwrap();
        assert!(f.store.expense(expense.id).is_none());
    }

    #[tokio::test]
    async fn test_only_owner_may_submit() {
        let f = fixture();
        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();
        let err = f.service.submit(UserId::new(), expense.id).await.unwrap_err();
        assert!(matches!(err, ExpenseError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_manager_approve_debits_limit() {
        let f = fixture();
        let boss = manager(f.owner.department_id);
        f.store.put_user(boss.clone());

        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();
        f.service.submit(f.owner.id, expense.id).await.unwrap();
        let approved = f.service.approve(boss.id, expense.id).await.unwrap();

        assert_eq!(approved.state(), ExpenseState::Approved);
        assert_eq!(
            f.store.user(f.owner.id).unwrap().allotted_limit,
            Some(dec!(481.60))
        );
    }

    #[tokio::test]
    async fn test_manager_of_other_department_is_forbidden() {
        let f = fixture();
        let outsider = manager(Some(DepartmentId::new()));
        f.store.put_user(outsider.clone());

        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();
        f.service.submit(f.owner.id, expense.id).await.unwrap();
        let err = f.service.approve(outsider.id, expense.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_reject_requires_reason_and_is_terminal() {
        let f = fixture();
        let boss = manager(f.owner.department_id);
        f.store.put_user(boss.clone());
        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();
        f.service.submit(f.owner.id, expense.id).await.unwrap();

        let err = f
            .service
            .reject(boss.id, expense.id, " ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::RejectionReasonRequired));

        let rejected = f
            .service
            .reject(boss.id, expense.id, "No receipt".to_string())
            .await
            .unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("No receipt"));

        let err = f.service.approve(boss.id, expense.id).await.unwrap_err();
        assert!(matches!(err, ExpenseError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_comments_append_after_resolution() {
        let f = fixture();
        let boss = manager(f.owner.department_id);
        f.store.put_user(boss.clone());
        let expense = f.service.create(f.owner.id, lunch()).await.unwrap();
        f.service.submit(f.owner.id, expense.id).await.unwrap();
        f.service
            .reject(boss.id, expense.id, "Duplicate of paper claim".to_string())
            .await
            .unwrap();

        f.service
            .add_comment(f.owner.id, expense.id, "Withdrawn paper claim".to_string())
            .await
            .unwrap();
        let stored = f.store.expense(expense.id).unwrap();
        assert_eq!(stored.comments.len(), 1);
        assert_eq!(stored.state(), ExpenseState::Rejected);
    }
}
