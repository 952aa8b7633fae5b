//! Auto-approval routes.
//!
//! Both passes are normally driven by a scheduler; these endpoints let an
//! operator trigger them on demand.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use tracing::info;

use expensa_core::approval::{AutoApprovalReport, ConfirmationReport};

use crate::{AppState, error::ApiError, middleware::CurrentUser};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/auto", post(run_auto_approval))
        .route("/approvals/confirm", post(confirm_auto_approvals))
}

/// 207 when some items failed, 200 otherwise.
const fn batch_status(failed: usize) -> StatusCode {
    if failed == 0 {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    }
}

/// POST /approvals/auto
async fn run_auto_approval(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<AutoApprovalReport>), ApiError> {
    info!(triggered_by = %user.id(), "Auto-approval batch requested");
    let report = state.approvals.run_batch().await?;
    Ok((batch_status(report.errors.len()), Json(report)))
}

/// POST /approvals/confirm
async fn confirm_auto_approvals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<ConfirmationReport>), ApiError> {
    info!(triggered_by = %user.id(), "Auto-approval confirmation requested");
    let report = state.approvals.confirm_auto_approvals().await?;
    Ok((batch_status(report.errors.len()), Json(report)))
}
