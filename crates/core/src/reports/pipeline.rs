//! Report generation pipeline.
//!
//! Each run persists a Generating shell first, then moves it to Completed
//! or Failed exactly once. Whatever the run produced before a failure
//! (the summary in particular) stays on the report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use expensa_shared::config::{AiConfig, ReportConfig};
use expensa_shared::types::{PageRequest, PageResponse, ReportId, UserId};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use crate::aggregation::{AggregationEngine, AggregationScope};
use crate::ai::{LanguageModel, generate_with_timeout};
use crate::expense::types::{Department, ExpenseFilter, User};
use crate::storage::{DocumentStorage, StorageError};
use crate::store::{DepartmentStore, ExpenseStore, ReportStore, UserStore};

use super::analysis::{AnalysisContext, build_request, parse_response};
use super::error::{FailureReason, ReportError};
use super::id::generate_external_id;
use super::period;
use super::render::RenderQueue;
use super::types::{Report, ReportKind, ReportListFilter, ReportRequest, ReportScope, ReportStatus};

/// Stores the pipeline reads from and writes to.
#[derive(Clone)]
pub struct ReportStores {
    /// Users.
    pub users: Arc<dyn UserStore>,
    /// Departments.
    pub departments: Arc<dyn DepartmentStore>,
    /// Expenses.
    pub expenses: Arc<dyn ExpenseStore>,
    /// Reports.
    pub reports: Arc<dyn ReportStore>,
}

/// Pipeline settings derived from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Canonical reporting currency.
    pub reporting_currency: String,
    /// Number of top merchants kept.
    pub top_merchants: usize,
    /// External id prefix for individual reports.
    pub individual_prefix: String,
    /// External id prefix for team reports.
    pub team_prefix: String,
    /// Analysis sampling temperature.
    pub temperature: Decimal,
    /// Analysis timeout.
    pub timeout: Duration,
}

impl PipelineSettings {
    /// Builds settings from the report and model sections.
    #[must_use]
    pub fn from_config(reports: &ReportConfig, ai: &AiConfig) -> Self {
        Self {
            reporting_currency: reports.reporting_currency.clone(),
            top_merchants: reports.top_merchants,
            individual_prefix: reports.individual_prefix.clone(),
            team_prefix: reports.team_prefix.clone(),
            temperature: ai.temperature,
            timeout: Duration::from_secs(ai.timeout_secs),
        }
    }

    fn prefix(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Individual => &self.individual_prefix,
            ReportKind::Team => &self.team_prefix,
        }
    }
}

/// Requester and target users for one run.
struct Targets {
    requester: User,
    department: Option<Department>,
    employees: Vec<User>,
}

/// Orchestrates report generation and retrieval.
#[derive(Clone)]
pub struct ReportPipeline {
    stores: ReportStores,
    model: Arc<dyn LanguageModel>,
    aggregator: AggregationEngine,
    render_queue: RenderQueue,
    documents: DocumentStorage,
    settings: PipelineSettings,
}

impl ReportPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        stores: ReportStores,
        model: Arc<dyn LanguageModel>,
        render_queue: RenderQueue,
        documents: DocumentStorage,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            aggregator: AggregationEngine::new(
                settings.top_merchants,
                settings.reporting_currency.clone(),
            ),
            stores,
            model,
            render_queue,
            documents,
            settings,
        }
    }

    /// Generates a report for `requester`.
    ///
    /// # Errors
    ///
    /// * `ReportError::MissingRangeBound` / `InvalidRange` before anything is
    ///   persisted
    /// * `ReportError::Failed` once the shell exists and a step fails,
    ///   store faults included; the report is left Failed with the cause
    /// * `ReportError::StatusConflict` if another writer settled the report
    /// * `ReportError::Store` if the shell itself cannot be written
    #[instrument(skip(self, request), fields(kind = request.kind.as_str()))]
    pub async fn generate(
        &self,
        requester: UserId,
        request: ReportRequest,
        today: NaiveDate,
    ) -> Result<Report, ReportError> {
        let resolved = period::resolve(&request, today)?;

        let now = Utc::now();
        let shell = Report {
            id: ReportId::new(),
            owner_id: requester,
            external_id: generate_external_id(self.settings.prefix(request.kind), now),
            title: resolved.title,
            scope: ReportScope {
                kind: request.kind,
                from: resolved.from,
                to: resolved.to,
                categories: request.categories,
                department_id: request.department_id,
                employee_ids: request.employee_ids,
            },
            status: ReportStatus::Generating,
            summary: None,
            analysis: None,
            expense_ids: Vec::new(),
            document_location: None,
            error_detail: None,
            render_error: None,
            generated_at: now,
            updated_at: now,
        };
        self.stores.reports.insert(&shell).await?;
        info!(external_id = %shell.external_id, "Report generation started");

        match self.run(&shell).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    external_id = %shell.external_id,
                    "Report left generating before completion"
                );
                return Err(ReportError::StatusConflict(shell.external_id));
            }
            Err(reason) => return self.fail(&shell, reason).await,
        }

        if let Err(e) = self.render_queue.enqueue(shell.id) {
            warn!(external_id = %shell.external_id, error = %e, "Could not enqueue rendering");
            if let Err(store_err) = self
                .stores
                .reports
                .set_render_error(shell.id, &e.to_string())
                .await
            {
                error!(
                    external_id = %shell.external_id,
                    error = %store_err,
                    "Could not record render error"
                );
            }
        }

        self.load(shell.id, &shell.external_id).await
    }

    /// Runs every step after the shell is persisted. Store faults become a
    /// failure reason so the shell never stays Generating.
    ///
    /// Returns `Ok(false)` if the report was no longer Generating when the
    /// analysis was stored.
    async fn run(&self, shell: &Report) -> Result<bool, FailureReason> {
        let targets = self.resolve_targets(shell).await?;

        let filter = ExpenseFilter {
            owners: targets.employees.iter().map(|u| u.id).collect(),
            from: Some(shell.scope.from),
            to: Some(shell.scope.to),
            categories: shell.scope.categories.clone(),
        };
        let expenses = self.stores.expenses.find_approved(&filter).await?;
        if expenses.is_empty() {
            return Err(FailureReason::NoExpenses);
        }

        let scope = AggregationScope {
            from: shell.scope.from,
            to: shell.scope.to,
            by_employee: shell.scope.kind == ReportKind::Team,
            employee_names: targets
                .employees
                .iter()
                .map(|u| (u.id, u.name.clone()))
                .collect::<HashMap<_, _>>(),
        };
        let summary = self.aggregator.aggregate(&expenses, &scope);
        let expense_ids: Vec<_> = expenses.iter().map(|e| e.id).collect();
        self.stores
            .reports
            .save_summary(shell.id, &summary, &expense_ids)
            .await?;

        let context = AnalysisContext {
            requester_name: targets.requester.name.clone(),
            department_name: targets.department.as_ref().map(|d| d.name.clone()),
            allowed_categories: targets
                .department
                .map(|d| d.allowed_categories)
                .unwrap_or_default(),
            currency: self.settings.reporting_currency.clone(),
        };
        let model_request = build_request(&summary, &context, self.settings.temperature);

        let text = generate_with_timeout(self.model.as_ref(), &model_request, self.settings.timeout)
            .await
            .map_err(|e| {
                if e.is_unavailable() {
                    FailureReason::AnalysisUnavailable(e.to_string())
                } else {
                    FailureReason::AnalysisParse(e.to_string())
                }
            })?;
        let analysis =
            parse_response(&text).map_err(|e| FailureReason::AnalysisParse(e.to_string()))?;

        let completed = self.stores.reports.complete(shell.id, &analysis).await?;
        if completed {
            info!(external_id = %shell.external_id, expenses = expense_ids.len(), "Report completed");
        }
        Ok(completed)
    }

    /// Resolves requester and targets.
    async fn resolve_targets(&self, shell: &Report) -> Result<Targets, FailureReason> {
        let requester = self
            .stores
            .users
            .find(shell.owner_id)
            .await?
            .ok_or(FailureReason::RequesterNotFound)?;

        match shell.scope.kind {
            ReportKind::Individual => {
                let department = match requester.department_id {
                    Some(id) => self.stores.departments.find(id).await?,
                    None => None,
                };
                Ok(Targets {
                    employees: vec![requester.clone()],
                    requester,
                    department,
                })
            }
            ReportKind::Team => {
                let department_id = shell
                    .scope
                    .department_id
                    .or(requester.department_id)
                    .ok_or(FailureReason::NoDepartment)?;
                let department = self
                    .stores
                    .departments
                    .find(department_id)
                    .await?
                    .ok_or(FailureReason::DepartmentNotFound)?;
                if !requester.can_decide_for(Some(department_id)) {
                    return Err(FailureReason::NotPermitted);
                }

                let mut employees = self.stores.users.list_by_department(department_id).await?;
                if !shell.scope.employee_ids.is_empty() {
                    employees.retain(|u| shell.scope.employee_ids.contains(&u.id));
                }
                if employees.is_empty() {
                    return Err(FailureReason::NoTargets);
                }

                Ok(Targets {
                    requester,
                    department: Some(department),
                    employees,
                })
            }
        }
    }

    /// Marks the report Failed. Writing the failure is best-effort; the
    /// original reason is returned either way.
    async fn fail(&self, shell: &Report, reason: FailureReason) -> Result<Report, ReportError> {
        let cause = reason.cause();
        warn!(external_id = %shell.external_id, %cause, "Report generation failed");
        match self.stores.reports.fail(shell.id, &cause).await {
            Ok(true) => {}
            Ok(false) => warn!(
                external_id = %shell.external_id,
                "Report was no longer generating when marked failed"
            ),
            Err(e) => error!(
                external_id = %shell.external_id,
                error = %e,
                "Could not record report failure"
            ),
        }
        Err(ReportError::Failed {
            external_id: shell.external_id.clone(),
            reason,
        })
    }

    async fn load(&self, id: ReportId, external_id: &str) -> Result<Report, ReportError> {
        self.stores
            .reports
            .find(id)
            .await?
            .ok_or_else(|| ReportError::NotFound(external_id.to_string()))
    }

    /// Finds one of `owner`'s reports by external id.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::NotFound` if `owner` has no such report.
    pub async fn get(&self, owner: UserId, external_id: &str) -> Result<Report, ReportError> {
        self.stores
            .reports
            .find_by_external_id(owner, external_id)
            .await?
            .ok_or_else(|| ReportError::NotFound(external_id.to_string()))
    }

    /// Lists `owner`'s reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Store` on persistence failures.
    pub async fn list(
        &self,
        owner: UserId,
        filter: &ReportListFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Report>, ReportError> {
        let (reports, total) = self.stores.reports.list(owner, filter, page).await?;
        Ok(PageResponse::new(reports, page, total))
    }

    /// Reads the rendered document of one of `owner`'s reports.
    ///
    /// Returns the stored filename and bytes.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::DocumentUnavailable` until rendering has
    /// stored a document.
    pub async fn document(
        &self,
        owner: UserId,
        external_id: &str,
    ) -> Result<(String, Vec<u8>), ReportError> {
        let report = self.get(owner, external_id).await?;
        let Some(location) = report.document_location else {
            return Err(ReportError::DocumentUnavailable(report.external_id));
        };

        match self.documents.read(&location).await {
            Ok(bytes) => Ok((location, bytes)),
            Err(StorageError::NotFound { .. }) => {
                Err(ReportError::DocumentUnavailable(report.external_id))
            }
            Err(e) => Err(ReportError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;
    use crate::reports::render::{PagedTextRenderer, RenderJob, RenderWorker};
    use crate::testing::{
        FailingStore, MemoryStore, ScriptedModel, approved_expense, department, employee, manager,
    };
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    const ANALYSIS: &str = r#"```json
{"executive_summary": "Travel drove most of the spend.",
 "key_insights": ["Two trips account for 90%"],
 "recommendations": ["Book flights earlier"]}
```"#;

    struct Fixture {
        store: MemoryStore,
        model: Arc<ScriptedModel>,
        pipeline: ReportPipeline,
        jobs: mpsc::Receiver<RenderJob>,
        documents: DocumentStorage,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn fixture(model: ScriptedModel) -> Fixture {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let model = Arc::new(model);
        let (sender, jobs) = mpsc::channel(8);
        let documents = DocumentStorage::memory().unwrap();
        let pipeline = ReportPipeline::new(
            ReportStores {
                users: shared.clone(),
                departments: shared.clone(),
                expenses: shared.clone(),
                reports: shared,
            },
            model.clone(),
            RenderQueue::new(sender),
            documents.clone(),
            PipelineSettings::from_config(&ReportConfig::default(), &AiConfig::default()),
        );
        Fixture {
            store,
            model,
            pipeline,
            jobs,
            documents,
        }
    }

    fn failure(result: Result<Report, ReportError>) -> (String, FailureReason) {
        match result {
            Err(ReportError::Failed {
                external_id,
                reason,
            }) => (external_id, reason),
            other => panic!("expected a failed report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_expenses_fails_without_analysis() {
        let f = fixture(ScriptedModel::new([ANALYSIS]));
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());

        let (external_id, reason) =
            failure(f.pipeline.generate(owner.id, ReportRequest::individual(), today()).await);
        assert_eq!(reason, FailureReason::NoExpenses);

        let report = f.pipeline.get(owner.id, &external_id).await.unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.error_detail.as_deref(), Some("no expenses found"));
        assert!(report.analysis.is_none());
        assert!(report.summary.is_none());
        assert!(f.model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_analysis_keeps_summary() {
        let f = fixture(ScriptedModel::new(["The quarter looked healthy overall."]));
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());
        f.store
            .put_expense(approved_expense(owner.id, "Delta", "Travel", dec!(420), day(3)));

        let (external_id, reason) =
            failure(f.pipeline.generate(owner.id, ReportRequest::individual(), today()).await);
        assert!(matches!(reason, FailureReason::AnalysisParse(_)));

        let report = f.pipeline.get(owner.id, &external_id).await.unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(
            report.error_detail.as_deref(),
            Some("failed to parse analysis response")
        );
        let summary = report.summary.unwrap();
        assert_eq!(summary.total_count, 1);
        assert_eq!(summary.total_amount, dec!(420));
        assert_eq!(report.expense_ids.len(), 1);
        assert!(report.analysis.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_analysis_fails_with_cause() {
        let f = fixture(ScriptedModel::failing());
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());
        f.store
            .put_expense(approved_expense(owner.id, "Delta", "Travel", dec!(420), day(3)));

        let (external_id, reason) =
            failure(f.pipeline.generate(owner.id, ReportRequest::individual(), today()).await);
        assert!(matches!(reason, FailureReason::AnalysisUnavailable(_)));

        let report = f.pipeline.get(owner.id, &external_id).await.unwrap();
        assert!(
            report
                .error_detail
                .unwrap()
                .starts_with("analysis service unavailable: ")
        );
        assert!(report.summary.is_some());
    }

    #[tokio::test]
    async fn test_individual_report_completes_and_enqueues_render() {
        let mut f = fixture(ScriptedModel::new([ANALYSIS]));
        let dept = department("Engineering", dec!(10000));
        f.store.put_department(dept.clone());
        let owner = employee(Some(dept.id), Some(dec!(500)));
        f.store.put_user(owner.clone());
        f.store
            .put_expense(approved_expense(owner.id, "Delta", "Travel", dec!(420), day(3)));
        f.store
            .put_expense(approved_expense(owner.id, "Cafe", "Meals", dec!(12), day(5)));
        // Outside the month.
        f.store.put_expense(approved_expense(
            owner.id,
            "Hotel",
            "Travel",
            dec!(900),
            NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        ));

        let report = f
            .pipeline
            .generate(owner.id, ReportRequest::individual(), today())
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Completed);
        assert!(report.external_id.starts_with("IND-"));
        assert_eq!(report.title, "Individual Expense Report: 2026-10-01 to 2026-10-31");
        assert_eq!(report.summary.as_ref().unwrap().total_amount, dec!(432));
        assert_eq!(report.expense_ids.len(), 2);
        assert_eq!(
            report.analysis.unwrap().executive_summary,
            "Travel drove most of the spend."
        );

        let requests = f.model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("Engineering"));
        assert_eq!(requests[0].temperature, AiConfig::default().temperature);

        let job = f.jobs.try_recv().unwrap();
        assert_eq!(job.report_id, report.id);
    }

    #[tokio::test]
    async fn test_rendered_document_is_retrievable() {
        let mut f = fixture(ScriptedModel::new([ANALYSIS]));
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());
        f.store
            .put_expense(approved_expense(owner.id, "Delta", "Travel", dec!(420), day(3)));

        let report = f
            .pipeline
            .generate(owner.id, ReportRequest::individual(), today())
            .await
            .unwrap();
        assert!(matches!(
            f.pipeline.document(owner.id, &report.external_id).await,
            Err(ReportError::DocumentUnavailable(_))
        ));

        let worker = RenderWorker::new(
            Arc::new(f.store.clone()),
            Arc::new(PagedTextRenderer::default()),
            f.documents.clone(),
        );
        worker.handle(f.jobs.try_recv().unwrap()).await;

        let (filename, bytes) = f.pipeline.document(owner.id, &report.external_id).await.unwrap();
        assert_eq!(filename, format!("{}.txt", report.external_id));
        assert!(String::from_utf8(bytes).unwrap().contains("Executive Summary"));
    }

    #[tokio::test]
    async fn test_team_report_requires_manager() {
        let f = fixture(ScriptedModel::new([ANALYSIS]));
        let dept = department("Engineering", dec!(10000));
        f.store.put_department(dept.clone());
        let owner = employee(Some(dept.id), Some(dec!(500)));
        f.store.put_user(owner.clone());

        let (external_id, reason) =
            failure(f.pipeline.generate(owner.id, ReportRequest::team(), today()).await);
        assert_eq!(reason, FailureReason::NotPermitted);
        assert_eq!(
            f.pipeline.get(owner.id, &external_id).await.unwrap().status,
            ReportStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_team_report_groups_by_employee() {
        let f = fixture(ScriptedModel::new([ANALYSIS]));
        let dept = department("Engineering", dec!(10000));
        f.store.put_department(dept.clone());
        let boss = manager(Some(dept.id));
        let alice = employee(Some(dept.id), Some(dec!(500)));
        let bob = employee(Some(dept.id), Some(dec!(500)));
        for user in [&boss, &alice, &bob] {
            f.store.put_user(user.clone());
        }
        f.store
            .put_expense(approved_expense(alice.id, "Delta", "Travel", dec!(400), day(3)));
        f.store
            .put_expense(approved_expense(bob.id, "Cafe", "Meals", dec!(100), day(4)));

        let request = ReportRequest {
            employee_ids: vec![alice.id],
            ..ReportRequest::team()
        };
        let report = f.pipeline.generate(boss.id, request, today()).await.unwrap();

        assert!(report.external_id.starts_with("TEAM-"));
        let summary = report.summary.unwrap();
        assert_eq!(summary.total_amount, dec!(400));
        assert_eq!(summary.by_employee.len(), 1);
        assert_eq!(summary.by_employee[0].label, alice.name);
    }

    #[tokio::test]
    async fn test_invalid_range_persists_nothing() {
        let f = fixture(ScriptedModel::new([ANALYSIS]));
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());

        let request = ReportRequest {
            from: Some(day(10)),
            to: Some(day(1)),
            ..ReportRequest::individual()
        };
        let result = f.pipeline.generate(owner.id, request, today()).await;
        assert!(matches!(result, Err(ReportError::InvalidRange { .. })));

        let page = f
            .pipeline
            .list(owner.id, &ReportListFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let f = fixture(ScriptedModel::new([ANALYSIS]));
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());

        let _ = f.pipeline.generate(owner.id, ReportRequest::individual(), today()).await;
        f.store
            .put_expense(approved_expense(owner.id, "Delta", "Travel", dec!(420), day(3)));
        f.pipeline
            .generate(owner.id, ReportRequest::individual(), today())
            .await
            .unwrap();

        let failed = ReportListFilter {
            status: Some(ReportStatus::Failed),
            ..ReportListFilter::default()
        };
        let page = f
            .pipeline
            .list(owner.id, &failed, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].status, ReportStatus::Failed);

        let other = f
            .pipeline
            .list(UserId::new(), &ReportListFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(other.meta.total, 0);
    }

    #[tokio::test]
    async fn test_store_fault_after_shell_fails_report() {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let (sender, _jobs) = mpsc::channel(8);
        let pipeline = ReportPipeline::new(
            ReportStores {
                users: shared.clone(),
                departments: shared.clone(),
                expenses: Arc::new(FailingStore),
                reports: shared,
            },
            Arc::new(ScriptedModel::new([ANALYSIS])),
            RenderQueue::new(sender),
            DocumentStorage::memory().unwrap(),
            PipelineSettings::from_config(&ReportConfig::default(), &AiConfig::default()),
        );
        let owner = employee(None, Some(dec!(500)));
        store.put_user(owner.clone());

        let (external_id, reason) =
            failure(pipeline.generate(owner.id, ReportRequest::individual(), today()).await);
        assert!(matches!(reason, FailureReason::Storage(_)));

        let report = pipeline.get(owner.id, &external_id).await.unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(
            report
                .error_detail
                .unwrap()
                .starts_with("storage failure: ")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_settled_elsewhere_is_a_conflict() {
        let f = fixture(ScriptedModel::new([ANALYSIS]).with_delay(Duration::from_secs(1)));
        let owner = employee(None, Some(dec!(500)));
        f.store.put_user(owner.clone());
        f.store
            .put_expense(approved_expense(owner.id, "Delta", "Travel", dec!(420), day(3)));

        let pipeline = f.pipeline.clone();
        let owner_id = owner.id;
        let run = tokio::spawn(async move {
            pipeline
                .generate(owner_id, ReportRequest::individual(), today())
                .await
        });

        // The run is now waiting on the model.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let page = f
            .pipeline
            .list(owner_id, &ReportListFilter::default(), PageRequest::default())
            .await
            .unwrap();
        let shell = &page.data[0];
        assert_eq!(shell.status, ReportStatus::Generating);
        assert!(f.store.fail(shell.id, "cancelled by operator").await.unwrap());

        let result = run.await.unwrap();
        assert!(matches!(result, Err(ReportError::StatusConflict(_))));

        let report = f.store.report(shell.id).unwrap();
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.error_detail.as_deref(), Some("cancelled by operator"));
        assert!(report.analysis.is_none());
    }

    #[test]
    fn test_timeout_maps_to_unavailable() {
        assert!(AiError::Timeout(30).is_unavailable());
        assert!(!AiError::MalformedJson(String::new()).is_unavailable());
    }
}
