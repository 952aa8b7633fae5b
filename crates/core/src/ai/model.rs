//! Request contract for the language model service.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::AiError;

/// A document sent inline with a request, such as a receipt image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineDocument {
    /// MIME type of the payload.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl InlineDocument {
    /// Encodes raw bytes.
    #[must_use]
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Optional system instruction.
    pub system: Option<String>,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: Decimal,
    /// Optional inline document.
    pub attachment: Option<InlineDocument>,
}

impl ModelRequest {
    /// Creates a prompt-only request at temperature zero.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: Decimal::ZERO,
            attachment: None,
        }
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: Decimal) -> Self {
        self.temperature = temperature;
        self
    }

    /// Attaches an inline document.
    #[must_use]
    pub fn with_attachment(mut self, attachment: InlineDocument) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// A text-generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends the request and returns the raw response text.
    async fn generate(&self, request: &ModelRequest) -> Result<String, AiError>;
}

/// Runs `model.generate` under a hard time bound.
///
/// # Errors
///
/// Returns `AiError::Timeout` when the bound expires, or the model's own
/// error otherwise.
pub async fn generate_with_timeout(
    model: &dyn LanguageModel,
    request: &ModelRequest,
    timeout: Duration,
) -> Result<String, AiError> {
    tokio::time::timeout(timeout, model.generate(request))
        .await
        .map_err(|_| AiError::Timeout(timeout.as_secs()))?
}
