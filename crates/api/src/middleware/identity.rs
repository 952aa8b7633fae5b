//! Caller identification.
//!
//! Authentication lives in front of this service; the gateway forwards the
//! authenticated user's id in the `X-User-Id` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use expensa_shared::AppError;
use expensa_shared::types::UserId;

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the calling user.
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> impl IntoResponse {
///     let user_id = user.id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl CurrentUser {
    /// Returns the caller's id.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.0
    }
}

/// Parses the header value into a user id.
fn parse_user_id(value: &str) -> Option<UserId> {
    Uuid::parse_str(value.trim()).ok().map(UserId::from_uuid)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_user_id)
            .map(CurrentUser)
            .ok_or_else(|| {
                ApiError(AppError::Unauthorized(
                    "X-User-Id header with a valid user id is required".to_string(),
                ))
            })
    }
}
