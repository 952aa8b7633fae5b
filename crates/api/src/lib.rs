//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for expenses, approvals, reports and departments
//! - Caller identification
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Largest accepted request body; receipts are the biggest payload.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Creates the main application router.
///
/// `request_timeout` bounds every request, report generation included.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(timeout_layer(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[allow(deprecated)]
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::new(timeout)
}
