//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};

use super::{CodeGenerator, GenerationRequest};

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Anthropic Messages endpoint.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_url: String,
    api_version: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Creates a client from generator settings and an API key.
    pub fn new(config: &GeneratorConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_version: config.api_version.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Returns the model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Extracts the generated text from a Messages API response body.
fn extract_text(body: &str) -> Result<String> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| Error::Generation(format!("unexpected API response format: {}", e)))?;

    let first = parsed.content.into_iter().next().ok_or_else(|| {
        Error::Generation(format!("unexpected API response format: {}", body))
    })?;

    if first.kind != "text" {
        return Err(Error::Generation(format!(
            "unexpected content type: {}",
            first.kind
        )));
    }

    first
        .text
        .ok_or_else(|| Error::Generation("text block has no text".to_string()))
}

#[async_trait]
impl CodeGenerator for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            messages: vec![Message {
                role: "user",
                content: &request.instruction,
            }],
        };

        tracing::info!(
            model = %self.model,
            language = ?request.language,
            instruction_len = request.instruction.len(),
            "requesting generation"
        );

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Generation(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            tracing::warn!(%status, "generation request rejected");
            return Err(Error::Generation(format!(
                "request failed with status {}: {}",
                status, text
            )));
        }

        let generated = extract_text(&text)?;
        tracing::debug!(len = generated.len(), "received generated text");
        Ok(generated)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
