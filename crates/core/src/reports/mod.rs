//! Report pipeline.
//!
//! Resolves a date range, aggregates approved expenses, asks the analysis
//! service for narrative sections, and hands completed reports to the
//! background render worker.

pub mod analysis;
pub mod error;
pub mod id;
pub mod period;
pub mod pipeline;
pub mod render;
pub mod types;

pub use analysis::{AnalysisContext, AnalysisSections};
pub use error::{FailureReason, ReportError};
pub use id::{generate_external_id, is_valid_external_id};
pub use period::ResolvedPeriod;
pub use pipeline::{PipelineSettings, ReportPipeline, ReportStores};
pub use render::{
    DocumentRenderer, DocumentSection, PagedTextRenderer, RenderError, RenderJob, RenderQueue,
    RenderWorker, RenderedDocument, ReportDocument, SectionBody, build_document,
    spawn_render_worker,
};
pub use types::{
    NamedPeriod, Report, ReportKind, ReportListFilter, ReportRequest, ReportScope, ReportStatus,
};
