//! In-memory stores, a scripted language model and fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use expensa_shared::types::{DepartmentId, ExpenseId, PageRequest, ReportId, UserId};
use rust_decimal::Decimal;

use crate::aggregation::{AggregationEngine, AggregationScope, ExpenseSummary};
use crate::ai::{AiError, LanguageModel, ModelRequest};
use crate::expense::types::{
    ApprovalStatus, AuditComment, Department, Expense, ExpenseFilter, ExpenseState,
    SubmissionStatus, User, UserRole,
};
use crate::expense::workflow::ExpenseTransition;
use crate::reports::analysis::AnalysisSections;
use crate::reports::types::{Report, ReportKind, ReportListFilter, ReportScope, ReportStatus};
use crate::store::{DepartmentStore, ExpenseStore, ReportStore, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    expenses: HashMap<ExpenseId, Expense>,
    users: HashMap<UserId, User>,
    departments: HashMap<DepartmentId, Department>,
    reports: HashMap<ReportId, Report>,
}

/// Every store in one shared in-memory table set.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn put_expense(&self, expense: Expense) {
        self.lock().expenses.insert(expense.id, expense);
    }

    pub fn put_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    pub fn put_department(&self, department: Department) {
        self.lock().departments.insert(department.id, department);
    }

    pub fn put_report(&self, report: Report) {
        self.lock().reports.insert(report.id, report);
    }

    pub fn expense(&self, id: ExpenseId) -> Option<Expense> {
        self.lock().expenses.get(&id).cloned()
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    pub fn report(&self, id: ReportId) -> Option<Report> {
        self.lock().reports.get(&id).cloned()
    }

    pub fn expense_count(&self) -> usize {
        self.lock().expenses.len()
    }

    fn update_generating(&self, id: ReportId, f: impl FnOnce(&mut Report)) -> bool {
        let mut tables = self.lock();
        match tables.reports.get_mut(&id) {
            Some(report) if report.status == ReportStatus::Generating => {
                f(report);
                report.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    fn update_report(&self, id: ReportId, f: impl FnOnce(&mut Report)) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let report = tables
            .reports
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("report {id}")))?;
        f(report);
        report.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn insert(&self, expense: &Expense) -> Result<(), StoreError> {
        self.put_expense(expense.clone());
        Ok(())
    }

    async fn find(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError> {
        Ok(self.expense(id))
    }

    async fn save_draft(&self, expense: &Expense) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.expenses.get_mut(&expense.id) {
            Some(existing) if existing.state() == ExpenseState::Draft => {
                *existing = expense.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft(&self, id: ExpenseId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let is_draft = tables
            .expenses
            .get(&id)
            .is_some_and(|e| e.state() == ExpenseState::Draft);
        if is_draft {
            tables.expenses.remove(&id);
        }
        Ok(is_draft)
    }

    async fn find_by_fingerprint(
        &self,
        owner: UserId,
        fingerprint: &str,
    ) -> Result<Option<Expense>, StoreError> {
        Ok(self
            .lock()
            .expenses
            .values()
            .find(|e| e.owner_id == owner && e.fingerprint.as_deref() == Some(fingerprint))
            .cloned())
    }

    async fn find_recent_match(
        &self,
        owner: UserId,
        merchant: &str,
        amount: Decimal,
        since: DateTime<Utc>,
    ) -> Result<Option<Expense>, StoreError> {
        Ok(self
            .lock()
            .expenses
            .values()
            .find(|e| {
                e.owner_id == owner
                    && e.merchant.trim().eq_ignore_ascii_case(merchant.trim())
                    && e.amount == amount
                    && e.created_at >= since
            })
            .cloned())
    }

    async fn list_in_state(&self, state: ExpenseState) -> Result<Vec<Expense>, StoreError> {
        let mut found: Vec<Expense> = self
            .lock()
            .expenses
            .values()
            .filter(|e| e.state() == state)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.created_at);
        Ok(found)
    }

    async fn apply_transition(
        &self,
        id: ExpenseId,
        expected: ExpenseState,
        transition: &ExpenseTransition,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.expenses.get_mut(&id) {
            Some(expense) if expense.state() == expected => {
                transition.apply_to(expense);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_comment(
        &self,
        id: ExpenseId,
        comment: &AuditComment,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        Ok(tables
            .expenses
            .get_mut(&id)
            .map(|e| e.comments.push(comment.clone()))
            .is_some())
    }

    async fn find_approved(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        let mut found: Vec<Expense> = self
            .lock()
            .expenses
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.expense_date.cmp(&a.expense_date));
        Ok(found)
    }

    async fn approved_total(&self, owners: &[UserId]) -> Result<Decimal, StoreError> {
        Ok(self
            .lock()
            .expenses
            .values()
            .filter(|e| e.state() == ExpenseState::Approved && owners.contains(&e.owner_id))
            .map(|e| e.amount)
            .sum())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.user(id))
    }

    async fn list_by_department(&self, department: DepartmentId) -> Result<Vec<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| u.department_id == Some(department))
            .cloned()
            .collect())
    }

    async fn debit_limit(&self, id: UserId, amount: Decimal) -> Result<Decimal, StoreError> {
        let mut tables = self.lock();
        let limit = tables
            .users
            .get_mut(&id)
            .and_then(|u| u.allotted_limit.as_mut())
            .ok_or_else(|| StoreError::NotFound(format!("limit of user {id}")))?;
        *limit -= amount;
        Ok(*limit)
    }
}

#[async_trait]
impl DepartmentStore for MemoryStore {
    async fn find(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        Ok(self.lock().departments.get(&id).cloned())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert(&self, report: &Report) -> Result<(), StoreError> {
        self.put_report(report.clone());
        Ok(())
    }

    async fn find(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        Ok(self.report(id))
    }

    async fn find_by_external_id(
        &self,
        owner: UserId,
        external_id: &str,
    ) -> Result<Option<Report>, StoreError> {
        Ok(self
            .lock()
            .reports
            .values()
            .find(|r| r.owner_id == owner && r.external_id == external_id)
            .cloned())
    }

    async fn save_summary(
        &self,
        id: ReportId,
        summary: &ExpenseSummary,
        expense_ids: &[ExpenseId],
    ) -> Result<bool, StoreError> {
        Ok(self.update_generating(id, |r| {
            r.summary = Some(summary.clone());
            r.expense_ids = expense_ids.to_vec();
        }))
    }

    async fn complete(&self, id: ReportId, analysis: &AnalysisSections) -> Result<bool, StoreError> {
        Ok(self.update_generating(id, |r| {
            r.analysis = Some(analysis.clone());
            r.status = ReportStatus::Completed;
        }))
    }

    async fn fail(&self, id: ReportId, cause: &str) -> Result<bool, StoreError> {
        Ok(self.update_generating(id, |r| {
            r.error_detail = Some(cause.to_string());
            r.status = ReportStatus::Failed;
        }))
    }

    async fn set_document(&self, id: ReportId, location: &str) -> Result<(), StoreError> {
        self.update_report(id, |r| {
            r.document_location = Some(location.to_string());
            r.render_error = None;
        })
    }

    async fn set_render_error(&self, id: ReportId, message: &str) -> Result<(), StoreError> {
        self.update_report(id, |r| r.render_error = Some(message.to_string()))
    }

    async fn list(
        &self,
        owner: UserId,
        filter: &ReportListFilter,
        page: PageRequest,
    ) -> Result<(Vec<Report>, u64), StoreError> {
        let mut found: Vec<Report> = self
            .lock()
            .reports
            .values()
            .filter(|r| r.owner_id == owner && filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        let total = found.len() as u64;
        let data = found
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap())
            .take(usize::try_from(page.limit()).unwrap())
            .collect();
        Ok((data, total))
    }
}

/// An expense store whose every call fails.
pub struct FailingStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Backend("connection refused".to_string()))
}

#[async_trait]
impl ExpenseStore for FailingStore {
    async fn insert(&self, _: &Expense) -> Result<(), StoreError> {
        unavailable()
    }

    async fn find(&self, _: ExpenseId) -> Result<Option<Expense>, StoreError> {
        unavailable()
    }

    async fn save_draft(&self, _: &Expense) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn delete_draft(&self, _: ExpenseId) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn find_by_fingerprint(&self, _: UserId, _: &str) -> Result<Option<Expense>, StoreError> {
        unavailable()
    }

    async fn find_recent_match(
        &self,
        _: UserId,
        _: &str,
        _: Decimal,
        _: DateTime<Utc>,
    ) -> Result<Option<Expense>, StoreError> {
        unavailable()
    }

    async fn list_in_state(&self, _: ExpenseState) -> Result<Vec<Expense>, StoreError> {
        unavailable()
    }

    async fn apply_transition(
        &self,
        _: ExpenseId,
        _: ExpenseState,
        _: &ExpenseTransition,
    ) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn append_comment(&self, _: ExpenseId, _: &AuditComment) -> Result<bool, StoreError> {
        unavailable()
    }

    async fn find_approved(&self, _: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        unavailable()
    }

    async fn approved_total(&self, _: &[UserId]) -> Result<Decimal, StoreError> {
        unavailable()
    }
}

/// A language model that replays canned answers and records requests.
#[derive(Default)]
pub struct ScriptedModel {
    answers: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ModelRequest>>,
    failing: bool,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(AiError::Transport("connection reset".to_string()));
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AiError::Transport("no scripted answer left".to_string()))
    }
}

pub fn draft_expense(owner: UserId, merchant: &str, amount: Decimal) -> Expense {
    let now = Utc::now();
    Expense {
        id: ExpenseId::new(),
        owner_id: owner,
        department_id: None,
        department_name: None,
        merchant: merchant.to_string(),
        amount,
        currency: "USD".to_string(),
        category: "Meals".to_string(),
        description: None,
        expense_date: Some(now.date_naive()),
        fingerprint: None,
        submission_status: SubmissionStatus::Draft,
        approval_status: ApprovalStatus::Pending,
        rejection_reason: None,
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn approved_expense(
    owner: UserId,
    merchant: &str,
    category: &str,
    amount: Decimal,
    date: NaiveDate,
) -> Expense {
    let mut expense = draft_expense(owner, merchant, amount);
    expense.category = category.to_string();
    expense.expense_date = Some(date);
    set_state(&mut expense, ExpenseState::Approved);
    expense
}

pub fn set_state(expense: &mut Expense, state: ExpenseState) {
    let (submission, approval) = state.statuses();
    expense.submission_status = submission;
    expense.approval_status = approval;
}

fn user(role: UserRole, department: Option<DepartmentId>, limit: Option<Decimal>) -> User {
    let id = UserId::new();
    User {
        id,
        name: format!("{} {id}", role.as_str()),
        email: format!("{id}@example.com"),
        role,
        department_id: department,
        allotted_limit: limit,
    }
}

pub fn employee(department: Option<DepartmentId>, limit: Option<Decimal>) -> User {
    user(UserRole::Employee, department, limit)
}

pub fn manager(department: Option<DepartmentId>) -> User {
    user(UserRole::Manager, department, None)
}

pub fn department(name: &str, budget: Decimal) -> Department {
    Department {
        id: DepartmentId::new(),
        name: name.to_string(),
        manager_id: None,
        total_budget: budget,
        allowed_categories: vec!["Meals".to_string(), "Travel".to_string()],
    }
}

/// A completed individual report over October 2026.
pub fn completed_report(owner: UserId) -> Report {
    let from = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 10, 31).unwrap();
    let expenses = vec![
        approved_expense(owner, "Delta", "Travel", Decimal::new(42000, 2), from),
        approved_expense(owner, "Cafe", "Meals", Decimal::new(1250, 2), to),
    ];
    let scope = AggregationScope {
        from,
        to,
        by_employee: false,
        employee_names: HashMap::new(),
    };
    let summary = AggregationEngine::new(5, "USD").aggregate(&expenses, &scope);
    let now = Utc::now();

    Report {
        id: ReportId::new(),
        owner_id: owner,
        external_id: format!("IND-0a1b2c3d-{}", now.timestamp_millis()),
        title: "Individual Expense Report: 2026-10-01 to 2026-10-31".to_string(),
        scope: ReportScope {
            kind: ReportKind::Individual,
            from,
            to,
            categories: Vec::new(),
            department_id: None,
            employee_ids: Vec::new(),
        },
        status: ReportStatus::Completed,
        summary: Some(summary),
        analysis: Some(AnalysisSections {
            executive_summary: "Travel dominated October.".to_string(),
            key_insights: vec!["One flight is 97% of spend".to_string()],
            spending_patterns: Vec::new(),
            anomalies: Vec::new(),
            recommendations: vec!["Book earlier".to_string()],
            policy_observations: Vec::new(),
        }),
        expense_ids: expenses.iter().map(|e| e.id).collect(),
        document_location: None,
        error_detail: None,
        render_error: None,
        generated_at: now,
        updated_at: now,
    }
}
