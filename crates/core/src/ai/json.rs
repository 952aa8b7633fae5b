//! Extraction of JSON payloads from free-form model output.
//!
//! Models wrap JSON in fenced code blocks, prefix it with prose, or return
//! it bare. The first fenced block wins; otherwise the span from the first
//! `{` to the last `}` is used.

use serde::de::DeserializeOwned;

use super::error::AiError;

/// Returns the most likely JSON object in `text`.
#[must_use]
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(fenced) = fenced_block(text) {
        return Some(fenced);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the language tag, if any.
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    let inner = body[..close].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Parses a typed payload out of model output.
///
/// # Errors
///
/// Returns `AiError::EmptyResponse` for blank text and
/// `AiError::MalformedJson` when no valid payload is found.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }

    let block = extract_json_block(text)
        .ok_or_else(|| AiError::MalformedJson("no JSON object found".to_string()))?;

    serde_json::from_str(block).map_err(|e| AiError::MalformedJson(e.to_string()))
}
