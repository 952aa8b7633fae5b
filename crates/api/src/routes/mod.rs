//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod approvals;
pub mod departments;
pub mod expenses;
pub mod health;
pub mod reports;

/// Creates the API router with all routes.
///
/// Every route except `/health` identifies the caller through
/// [`crate::middleware::CurrentUser`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(expenses::routes())
        .merge(approvals::routes())
        .merge(reports::routes())
        .merge(departments::routes())
}
