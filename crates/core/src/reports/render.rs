//! Report documents and the background render worker.
//!
//! A completed report is turned into a list of sections, handed to a
//! [`DocumentRenderer`], and stored as `<external-id>.<ext>`. Rendering runs
//! on a spawned task fed by a bounded channel; failures are recorded on the
//! report and never touch its status.

use std::fmt::Write as _;
use std::sync::Arc;

use expensa_shared::types::ReportId;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::storage::{DocumentStorage, StorageError};
use crate::store::{ReportStore, StoreError};

use super::types::{Report, ReportStatus};

/// Render failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The report does not exist.
    #[error("report {0} not found")]
    ReportNotFound(ReportId),

    /// The report has not completed.
    #[error("report {0} is not completed")]
    NotCompleted(ReportId),

    /// The renderer rejected the document.
    #[error("rendering failed: {0}")]
    Renderer(String),

    /// The render queue is full.
    #[error("render queue is full")]
    QueueFull,

    /// The render worker has stopped.
    #[error("render worker is not running")]
    QueueClosed,

    /// Document storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Body of one document section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    /// Label/value pairs.
    KeyValues(Vec<(String, String)>),
    /// Tabular rows.
    Table {
        /// Column headers.
        headers: Vec<String>,
        /// Rows, one cell per header.
        rows: Vec<Vec<String>>,
    },
    /// Bullet list.
    Bullets(Vec<String>),
    /// Free text.
    Paragraph(String),
}

/// A titled document section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSection {
    /// Section title.
    pub title: String,
    /// Section body.
    pub body: SectionBody,
}

impl DocumentSection {
    fn new(title: &str, body: SectionBody) -> Self {
        Self {
            title: title.to_string(),
            body,
        }
    }
}

/// Structured input to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Document title.
    pub title: String,
    /// Sections in order.
    pub sections: Vec<DocumentSection>,
}

/// Renderer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Document bytes.
    pub bytes: Vec<u8>,
    /// File extension without the dot.
    pub extension: &'static str,
    /// MIME type.
    pub content_type: &'static str,
}

/// Turns a section list into a paginated artifact.
pub trait DocumentRenderer: Send + Sync {
    /// Renders `document`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Renderer` if the document cannot be produced.
    fn render(&self, document: &ReportDocument) -> Result<RenderedDocument, RenderError>;
}

/// Builds the section list for a report.
#[must_use]
pub fn build_document(report: &Report) -> ReportDocument {
    let mut sections = Vec::new();

    let mut overview = vec![
        ("Report ID".to_string(), report.external_id.clone()),
        ("Type".to_string(), report.scope.kind.label().to_string()),
        (
            "Period".to_string(),
            format!("{} to {}", report.scope.from, report.scope.to),
        ),
        ("Generated".to_string(), report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()),
    ];
    if !report.scope.categories.is_empty() {
        overview.push(("Categories".to_string(), report.scope.categories.join(", ")));
    }

    if let Some(summary) = &report.summary {
        let currency = &summary.currency;
        overview.extend([
            ("Expenses".to_string(), summary.total_count.to_string()),
            ("Total".to_string(), format!("{currency} {}", summary.total_amount)),
            ("Average".to_string(), format!("{currency} {}", summary.average_amount)),
        ]);
        if let Some(largest) = &summary.largest_expense {
            overview.push((
                "Largest expense".to_string(),
                format!("{} ({currency} {})", largest.merchant, largest.amount),
            ));
        }
    }
    sections.push(DocumentSection::new("Overview", SectionBody::KeyValues(overview)));

    if let Some(analysis) = &report.analysis {
        sections.push(DocumentSection::new(
            "Executive Summary",
            SectionBody::Paragraph(analysis.executive_summary.clone()),
        ));
    }

    if let Some(summary) = &report.summary {
        let group_headers = |first: &str| {
            vec![
                first.to_string(),
                "Count".to_string(),
                "Amount".to_string(),
                "Share".to_string(),
            ]
        };
        let group_rows = |groups: &[crate::aggregation::GroupTotal]| {
            groups
                .iter()
                .map(|g| {
                    vec![
                        g.label.clone(),
                        g.count.to_string(),
                        g.amount.to_string(),
                        format!("{}%", g.percentage),
                    ]
                })
                .collect::<Vec<_>>()
        };

        sections.push(DocumentSection::new(
            "Spending by Category",
            SectionBody::Table {
                headers: group_headers("Category"),
                rows: group_rows(&summary.by_category),
            },
        ));
        sections.push(DocumentSection::new(
            "Monthly Spending",
            SectionBody::Table {
                headers: group_headers("Month"),
                rows: group_rows(&summary.by_month),
            },
        ));
        if !summary.by_employee.is_empty() {
            sections.push(DocumentSection::new(
                "Spending by Employee",
                SectionBody::Table {
                    headers: group_headers("Employee"),
                    rows: group_rows(&summary.by_employee),
                },
            ));
        }
        if !summary.top_merchants.is_empty() {
            sections.push(DocumentSection::new(
                "Top Merchants",
                SectionBody::Table {
                    headers: group_headers("Merchant"),
                    rows: summary
                        .top_merchants
                        .iter()
                        .map(|m| {
                            vec![
                                m.merchant.clone(),
                                m.count.to_string(),
                                m.amount.to_string(),
                                format!("{}%", m.percentage),
                            ]
                        })
                        .collect(),
                },
            ));
        }

        let mut trend = vec![(
            "Direction".to_string(),
            summary.trend.direction.label().to_string(),
        )];
        if let (Some(prev), Some(curr)) = (&summary.trend.previous_month, &summary.trend.current_month) {
            trend.push(("Months".to_string(), format!("{prev} to {curr}")));
        }
        if let Some(change) = summary.trend.change_pct {
            trend.push(("Change".to_string(), format!("{change}%")));
        }
        sections.push(DocumentSection::new("Trend", SectionBody::KeyValues(trend)));
    }

    if let Some(analysis) = &report.analysis {
        for (title, items) in [
            ("Key Insights", &analysis.key_insights),
            ("Spending Patterns", &analysis.spending_patterns),
            ("Anomalies", &analysis.anomalies),
            ("Recommendations", &analysis.recommendations),
            ("Policy Observations", &analysis.policy_observations),
        ] {
            if !items.is_empty() {
                sections.push(DocumentSection::new(title, SectionBody::Bullets(items.clone())));
            }
        }
    }

    ReportDocument {
        title: report.title.clone(),
        sections,
    }
}

/// Plain-text renderer with fixed-height pages separated by form feeds.
#[derive(Debug, Clone)]
pub struct PagedTextRenderer {
    lines_per_page: usize,
}

impl Default for PagedTextRenderer {
    fn default() -> Self {
        Self { lines_per_page: 60 }
    }
}

impl PagedTextRenderer {
    /// Creates a renderer with the given page height, at least 5 lines.
    #[must_use]
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(5),
        }
    }

    fn lay_out(document: &ReportDocument) -> Vec<String> {
        let mut lines = vec![document.title.clone(), "=".repeat(document.title.chars().count())];

        for section in &document.sections {
            lines.push(String::new());
            lines.push(section.title.clone());
            lines.push("-".repeat(section.title.chars().count()));

            match &section.body {
                SectionBody::KeyValues(pairs) => {
                    let width = pairs.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
                    for (key, value) in pairs {
                        lines.push(format!("{key:<width$}  {value}"));
                    }
                }
                SectionBody::Table { headers, rows } => {
                    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
                    for row in rows {
                        for (i, cell) in row.iter().enumerate() {
                            if let Some(w) = widths.get_mut(i) {
                                *w = (*w).max(cell.chars().count());
                            }
                        }
                    }
                    lines.push(table_row(headers, &widths));
                    lines.push(
                        widths
                            .iter()
                            .map(|w| "-".repeat(*w))
                            .collect::<Vec<_>>()
                            .join("  "),
                    );
                    for row in rows {
                        lines.push(table_row(row, &widths));
                    }
                    if rows.is_empty() {
                        lines.push("(none)".to_string());
                    }
                }
                SectionBody::Bullets(items) => {
                    lines.extend(items.iter().map(|item| format!("* {item}")));
                }
                SectionBody::Paragraph(text) => {
                    lines.extend(text.lines().map(str::to_string));
                }
            }
        }

        lines
    }
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

impl DocumentRenderer for PagedTextRenderer {
    fn render(&self, document: &ReportDocument) -> Result<RenderedDocument, RenderError> {
        if document.sections.is_empty() {
            return Err(RenderError::Renderer("document has no sections".to_string()));
        }

        let lines = Self::lay_out(document);
        // Leave room for the footer and its blank line.
        let body_lines = self.lines_per_page - 2;
        let pages: Vec<&[String]> = lines.chunks(body_lines).collect();
        let total = pages.len();

        let mut out = String::new();
        for (index, page) in pages.iter().enumerate() {
            if index > 0 {
                out.push('\u{c}');
            }
            for line in *page {
                out.push_str(line);
                out.push('\n');
            }
            let _ = writeln!(out, "\n{:>72}", format!("Page {} of {total}", index + 1));
        }

        Ok(RenderedDocument {
            bytes: out.into_bytes(),
            extension: "txt",
            content_type: "text/plain; charset=utf-8",
        })
    }
}

/// A request to render one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderJob {
    /// Report to render.
    pub report_id: ReportId,
}

/// Sending half of the render channel.
#[derive(Debug, Clone)]
pub struct RenderQueue {
    sender: mpsc::Sender<RenderJob>,
}

impl RenderQueue {
    /// Wraps a channel sender.
    #[must_use]
    pub fn new(sender: mpsc::Sender<RenderJob>) -> Self {
        Self { sender }
    }

    /// Enqueues a job without waiting.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::QueueFull` or `RenderError::QueueClosed`.
    pub fn enqueue(&self, report_id: ReportId) -> Result<(), RenderError> {
        self.sender
            .try_send(RenderJob { report_id })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => RenderError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => RenderError::QueueClosed,
            })
    }
}

/// Renders queued reports and stores their documents.
#[derive(Clone)]
pub struct RenderWorker {
    reports: Arc<dyn ReportStore>,
    renderer: Arc<dyn DocumentRenderer>,
    storage: DocumentStorage,
}

impl RenderWorker {
    /// Creates a worker.
    #[must_use]
    pub fn new(
        reports: Arc<dyn ReportStore>,
        renderer: Arc<dyn DocumentRenderer>,
        storage: DocumentStorage,
    ) -> Self {
        Self {
            reports,
            renderer,
            storage,
        }
    }

    /// Renders and stores one report, returning the document location.
    ///
    /// # Errors
    ///
    /// Returns a `RenderError` if the report is missing or not completed, or
    /// rendering or storage fails.
    pub async fn render(&self, report_id: ReportId) -> Result<String, RenderError> {
        let report = self
            .reports
            .find(report_id)
            .await?
            .ok_or(RenderError::ReportNotFound(report_id))?;

        if report.status != ReportStatus::Completed {
            return Err(RenderError::NotCompleted(report_id));
        }

        let rendered = self.renderer.render(&build_document(&report))?;
        let filename = format!("{}.{}", report.external_id, rendered.extension);
        let location = self
            .storage
            .put(&filename, rendered.bytes, rendered.content_type)
            .await?;

        self.reports.set_document(report_id, &location).await?;
        Ok(location)
    }

    /// Processes one job, recording failures on the report.
    pub async fn handle(&self, job: RenderJob) {
        match self.render(job.report_id).await {
            Ok(location) => info!(report_id = %job.report_id, %location, "Report document stored"),
            Err(e) => {
                error!(report_id = %job.report_id, error = %e, "Report rendering failed");
                if let Err(store_err) = self
                    .reports
                    .set_render_error(job.report_id, &e.to_string())
                    .await
                {
                    warn!(report_id = %job.report_id, error = %store_err, "Could not record render error");
                }
            }
        }
    }

    /// Drains the channel until every sender is dropped.
    pub async fn run(self, mut receiver: mpsc::Receiver<RenderJob>) {
        while let Some(job) = receiver.recv().await {
            self.handle(job).await;
        }
        info!("Render worker stopped");
    }
}

/// Spawns the worker on a bounded channel.
#[must_use]
pub fn spawn_render_worker(worker: RenderWorker, capacity: usize) -> (RenderQueue, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(worker.run(receiver));
    (RenderQueue::new(sender), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::analysis::AnalysisSections;
    use crate::testing::{MemoryStore, completed_report};
    use expensa_shared::types::UserId;

    struct BrokenRenderer;

    impl DocumentRenderer for BrokenRenderer {
        fn render(&self, _document: &ReportDocument) -> Result<RenderedDocument, RenderError> {
            Err(RenderError::Renderer("font missing".to_string()))
        }
    }

    fn worker(store: &MemoryStore, renderer: Arc<dyn DocumentRenderer>) -> (RenderWorker, DocumentStorage) {
        let storage = DocumentStorage::memory().unwrap();
        let reports: Arc<dyn ReportStore> = Arc::new(store.clone());
        (RenderWorker::new(reports, renderer, storage.clone()), storage)
    }

    #[test]
    fn test_document_sections() {
        let report = completed_report(UserId::new());
        let document = build_document(&report);

        let titles: Vec<&str> = document.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles[0], "Overview");
        assert!(titles.contains(&"Executive Summary"));
        assert!(titles.contains(&"Spending by Category"));
        assert!(titles.contains(&"Key Insights"));
        assert!(!titles.contains(&"Anomalies"));
    }

    #[test]
    fn test_paged_text_paginates() {
        let mut report = completed_report(UserId::new());
        report.analysis = Some(AnalysisSections {
            executive_summary: "Busy quarter.".to_string(),
            key_insights: (0..40).map(|i| format!("insight {i}")).collect(),
            spending_patterns: Vec::new(),
            anomalies: Vec::new(),
            recommendations: Vec::new(),
            policy_observations: Vec::new(),
        });

        let rendered = PagedTextRenderer::new(20).render(&build_document(&report)).unwrap();
        let text = String::from_utf8(rendered.bytes).unwrap();
        let pages = text.split('\u{c}').count();

        assert!(pages > 1);
        assert!(text.contains(&format!("Page 1 of {pages}")));
        assert!(text.contains(&format!("Page {pages} of {pages}")));
        assert_eq!(rendered.extension, "txt");
    }

    #[tokio::test]
    async fn test_worker_stores_document_under_external_id() {
        let store = MemoryStore::new();
        let report = completed_report(UserId::new());
        store.put_report(report.clone());
        let (worker, storage) = worker(&store, Arc::new(PagedTextRenderer::default()));

        let location = worker.render(report.id).await.unwrap();

        assert_eq!(location, format!("{}.txt", report.external_id));
        assert!(storage.exists(&location).await);
        let stored = store.report(report.id).unwrap();
        assert_eq!(stored.document_location.as_deref(), Some(location.as_str()));
        assert_eq!(stored.status, ReportStatus::Completed);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_status() {
        let store = MemoryStore::new();
        let report = completed_report(UserId::new());
        store.put_report(report.clone());
        let (worker, _) = worker(&store, Arc::new(BrokenRenderer));

        worker.handle(RenderJob { report_id: report.id }).await;

        let stored = store.report(report.id).unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
        assert!(stored.document_location.is_none());
        assert!(stored.render_error.unwrap().contains("font missing"));
    }

    #[tokio::test]
    async fn test_queue_full() {
        let (sender, _receiver) = mpsc::channel(1);
        let queue = RenderQueue::new(sender);
        queue.enqueue(ReportId::new()).unwrap();
        assert!(matches!(queue.enqueue(ReportId::new()), Err(RenderError::QueueFull)));
    }

    #[tokio::test]
    async fn test_spawned_worker_drains_queue() {
        let store = MemoryStore::new();
        let report = completed_report(UserId::new());
        store.put_report(report.clone());
        let (worker, _) = worker(&store, Arc::new(PagedTextRenderer::default()));

        let (queue, handle) = spawn_render_worker(worker, 4);
        queue.enqueue(report.id).unwrap();
        drop(queue);
        handle.await.unwrap();

        assert!(store.report(report.id).unwrap().document_location.is_some());
    }
}
