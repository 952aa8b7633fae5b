//! HTTP client for the language model service.

use std::time::Duration;

use async_trait::async_trait;
use expensa_shared::config::AiConfig;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::AiError;
use super::model::{InlineDocument, LanguageModel, ModelRequest};

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    temperature: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<&'a InlineDocument>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

/// Language model reached over HTTP with bearer authentication.
pub struct HttpLanguageModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLanguageModel {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(&self, request: &ModelRequest) -> Result<String, AiError> {
        let body = GenerateRequest {
            model: &self.model,
            temperature: request.temperature,
            system: request.system.as_deref(),
            prompt: &request.prompt,
            attachments: request.attachment.iter().collect(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: clip_error_body(text),
            });
        }

        let payload: GenerateResponse = response.json().await?;
        debug!(chars = payload.text.len(), "Language model responded");

        if payload.text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(payload.text)
    }
}

/// Cuts `text` to at most `MAX_ERROR_BODY` bytes on a char boundary.
fn clip_error_body(mut text: String) -> String {
    let cut = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .take_while(|&i| i <= MAX_ERROR_BODY)
        .last()
        .unwrap_or(0);
    text.truncate(cut);
    text
}
