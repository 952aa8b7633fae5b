//! Language model call errors.

use expensa_shared::ErrorCategory;
use thiserror::Error;

/// Failure talking to or interpreting the language model service.
#[derive(Debug, Error)]
pub enum AiError {
    /// The call did not finish inside its time budget.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The request could not be sent or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response envelope could not be decoded.
    #[error("invalid response envelope: {0}")]
    Decode(String),

    /// The service answered with no text.
    #[error("empty response")]
    EmptyResponse,

    /// The response text did not contain the expected JSON.
    #[error("malformed JSON payload: {0}")]
    MalformedJson(String),
}

impl AiError {
    /// Returns true for failures of the call itself, as opposed to
    /// failures interpreting a response that did arrive.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport(_) | Self::Status { .. } | Self::Decode(_)
        )
    }

    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::ExternalService
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "AI_TIMEOUT",
            Self::Transport(_) | Self::Status { .. } | Self::Decode(_) => "AI_UNAVAILABLE",
            Self::EmptyResponse => "AI_EMPTY_RESPONSE",
            Self::MalformedJson(_) => "AI_MALFORMED_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
