//! Department routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use expensa_core::budget::DepartmentUtilization;
use expensa_shared::types::DepartmentId;

use crate::{AppState, error::ApiError, middleware::CurrentUser};

/// Creates the department routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/departments/{department_id}/utilization",
        get(get_utilization),
    )
}

/// GET /departments/{department_id}/utilization
async fn get_utilization(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(department_id): Path<DepartmentId>,
) -> Result<Json<DepartmentUtilization>, ApiError> {
    let utilization = state
        .budget
        .project_department_utilization(department_id)
        .await?;
    Ok(Json(utilization))
}
