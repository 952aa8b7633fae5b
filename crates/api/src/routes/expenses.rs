//! Expense routes.
//!
//! Drafts are created manually or from an uploaded receipt, edited while
//! still drafts, then submitted. Managers approve or reject submitted
//! expenses; anyone may comment.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;

use expensa_core::expense::{AuditComment, Expense, ExpenseUpdate, NewExpense, ReceiptUpload};
use expensa_shared::types::ExpenseId;

use crate::{AppState, error::ApiError, middleware::CurrentUser};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        .route("/expenses/receipt", post(upload_receipt))
        .route(
            "/expenses/{expense_id}",
            get(get_expense).patch(update_expense).delete(delete_expense),
        )
        .route("/expenses/{expense_id}/submit", post(submit_expense))
        .route("/expenses/{expense_id}/comments", post(add_comment))
        .route("/expenses/{expense_id}/approve", post(approve_expense))
        .route("/expenses/{expense_id}/reject", post(reject_expense))
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of a comment.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    /// Comment text.
    pub body: String,
}

/// Body of a rejection.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Why the expense was rejected.
    #[serde(default)]
    pub reason: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /expenses
async fn create_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let expense = state.expenses.create(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// POST /expenses/receipt
///
/// The body is the raw receipt file; `Content-Type` names its format.
async fn upload_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    info!(user_id = %user.id(), size = body.len(), %mime_type, "Receipt uploaded");

    let upload = ReceiptUpload {
        bytes: body.to_vec(),
        mime_type,
    };
    let expense = state.expenses.create_from_receipt(user.id(), upload).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /expenses/{expense_id}
async fn get_expense(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(state.expenses.get(expense_id).await?))
}

/// PATCH /expenses/{expense_id}
async fn update_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
    Json(update): Json<ExpenseUpdate>,
) -> Result<Json<Expense>, ApiError> {
    let expense = state
        .expenses
        .update_draft(user.id(), expense_id, update)
        .await?;
    Ok(Json(expense))
}

/// DELETE /expenses/{expense_id}
async fn delete_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
) -> Result<StatusCode, ApiError> {
    state.expenses.delete_draft(user.id(), expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /expenses/{expense_id}/submit
async fn submit_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(state.expenses.submit(user.id(), expense_id).await?))
}

/// POST /expenses/{expense_id}/comments
async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<AuditComment>), ApiError> {
    let comment = state
        .expenses
        .add_comment(user.id(), expense_id, request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /expenses/{expense_id}/approve
async fn approve_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(state.expenses.approve(user.id(), expense_id).await?))
}

/// POST /expenses/{expense_id}/reject
async fn reject_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<ExpenseId>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<Expense>, ApiError> {
    let reason = request.reason.unwrap_or_default();
    let expense = state.expenses.reject(user.id(), expense_id, reason).await?;
    Ok(Json(expense))
}
