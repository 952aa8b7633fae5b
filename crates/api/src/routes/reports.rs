//! Report routes.
//!
//! Generation runs inline and answers with the finished report; the
//! printable document is rendered in the background and becomes
//! downloadable once stored.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use expensa_core::reports::{Report, ReportListFilter, ReportRequest, ReportStatus};
use expensa_shared::types::{PageRequest, PageResponse};

use crate::{AppState, error::ApiError, middleware::CurrentUser};

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports).post(generate_report))
        .route("/reports/{external_id}", get(get_report))
        .route("/reports/{external_id}/document", get(download_document))
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters for listing reports.
#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    /// Only reports in this status.
    pub status: Option<ReportStatus>,
    /// Generated at or after.
    pub generated_from: Option<DateTime<Utc>>,
    /// Generated at or before.
    pub generated_to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub limit: Option<u32>,
}

impl ListReportsQuery {
    fn into_parts(self) -> (ReportListFilter, PageRequest) {
        let defaults = PageRequest::default();
        let page = PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        );
        let filter = ReportListFilter {
            status: self.status,
            generated_from: self.generated_from,
            generated_to: self.generated_to,
        };
        (filter, page)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Content type for a stored document, by extension.
fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("txt") => "text/plain; charset=utf-8",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /reports
async fn generate_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ReportRequest>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    let today = Utc::now().date_naive();
    let report = state.reports.generate(user.id(), request, today).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports
async fn list_reports(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<PageResponse<Report>>, ApiError> {
    let (filter, page) = query.into_parts();
    Ok(Json(state.reports.list(user.id(), &filter, page).await?))
}

/// GET /reports/{external_id}
async fn get_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(external_id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(state.reports.get(user.id(), &external_id).await?))
}

/// GET /reports/{external_id}/document
async fn download_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(external_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (filename, bytes) = state.reports.document(user.id(), &external_id).await?;
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("IND-0a1b2c3d-1760000000000.txt", "text/plain; charset=utf-8")]
    #[case("TEAM-0a1b2c3d-1760000000000.pdf", "application/pdf")]
    #[case("no-extension", "application/octet-stream")]
    fn test_content_type_for(#[case] filename: &str, #[case] expected: &str) {
        assert_eq!(content_type_for(filename), expected);
    }

    #[test]
    fn test_query_defaults() {
        let (filter, page) = ListReportsQuery::default().into_parts();
        assert!(filter.status.is_none());
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
    }

    #[test]
    fn test_query_limit_is_clamped() {
        let query = ListReportsQuery {
            status: Some(ReportStatus::Completed),
            page: Some(0),
            limit: Some(5000),
            ..ListReportsQuery::default()
        };
        let (filter, page) = query.into_parts();
        assert_eq!(filter.status, Some(ReportStatus::Completed));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
    }
}
