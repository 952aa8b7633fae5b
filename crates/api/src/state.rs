//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use expensa_core::ai::LanguageModel;
use expensa_core::approval::{ApprovalPolicy, AutoApprovalEngine};
use expensa_core::budget::BudgetLedger;
use expensa_core::expense::{ExpenseService, ExpenseStores};
use expensa_core::reports::{PipelineSettings, RenderQueue, ReportPipeline, ReportStores};
use expensa_core::storage::DocumentStorage;
use expensa_core::store::{DepartmentStore, ExpenseStore, ReportStore, UserStore};
use expensa_db::{DepartmentRepository, ExpenseRepository, ReportRepository, UserRepository};
use expensa_shared::AppConfig;

/// Services reachable from every handler.
#[derive(Clone)]
pub struct AppState {
    /// Expense lifecycle.
    pub expenses: Arc<ExpenseService>,
    /// Auto-approval batch and confirmation.
    pub approvals: Arc<AutoApprovalEngine>,
    /// Report generation and retrieval.
    pub reports: Arc<ReportPipeline>,
    /// Allotted limits and department utilization.
    pub budget: BudgetLedger,
}

impl AppState {
    /// Wires the services over Postgres repositories.
    #[must_use]
    pub fn new(
        db: &DatabaseConnection,
        model: Arc<dyn LanguageModel>,
        documents: DocumentStorage,
        render_queue: RenderQueue,
        config: &AppConfig,
    ) -> Self {
        let expenses: Arc<dyn ExpenseStore> = Arc::new(ExpenseRepository::new(db.clone()));
        let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(db.clone()));
        let departments: Arc<dyn DepartmentStore> =
            Arc::new(DepartmentRepository::new(db.clone()));
        let reports: Arc<dyn ReportStore> = Arc::new(ReportRepository::new(db.clone()));

        let model_timeout = Duration::from_secs(config.ai.timeout_secs);
        let budget = BudgetLedger::new(users.clone(), departments.clone(), expenses.clone());

        let expense_service = ExpenseService::new(
            ExpenseStores {
                expenses: expenses.clone(),
                users: users.clone(),
                departments: departments.clone(),
            },
            model.clone(),
            &config.approval,
            model_timeout,
        );

        let engine = AutoApprovalEngine::new(
            expenses.clone(),
            users.clone(),
            budget.clone(),
            model.clone(),
            ApprovalPolicy::from_config(&config.approval),
            model_timeout,
        );

        let pipeline = ReportPipeline::new(
            ReportStores {
                users,
                departments,
                expenses,
                reports,
            },
            model,
            render_queue,
            documents,
            PipelineSettings::from_config(&config.reports, &config.ai),
        );

        Self {
            expenses: Arc::new(expense_service),
            approvals: Arc::new(engine),
            reports: Arc::new(pipeline),
            budget,
        }
    }
}
