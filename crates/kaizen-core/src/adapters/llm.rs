//! LLM client: calls the Anthropic Messages API over HTTP.
//!
//! POST {base_url}/v1/messages
//! Headers:
//!   x-api-key: {api_key}
//!   anthropic-version: 2023-06-01
//!   content-type: application/json

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::retry::RetryPolicy;
use crate::error::{AdapterError, ConfigError};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4000;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, AdapterError>;
}

/// Connection settings for [`AnthropicClient`].
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

pub struct AnthropicClient {
    client: reqwest::Client,
    config: AnthropicConfig,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("ANTHROPIC_API_KEY"));
        }
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str, temperature: f64) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });
        if !system_prompt.is_empty() {
            body["system"] = Value::String(system_prompt.to_string());
        }
        if let Some(temp) = serde_json::Number::from_f64(temperature) {
            body["temperature"] = Value::Number(temp);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<String, AdapterError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AdapterError::Status {
                service: "Anthropic",
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| AdapterError::Parse {
            service: "Anthropic",
            message: e.to_string(),
        })?;
        extract_text(&json)
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, AdapterError> {
        let body = self.request_body(system_prompt, user_prompt, temperature);
        info!(model = %self.config.model, temperature, "calling Anthropic API");
        let body = &body;
        self.retry.run("Anthropic API", move || self.send(body)).await
    }
}

/// Concatenate the `text` blocks of a Messages API response.
fn extract_text(json: &Value) -> Result<String, AdapterError> {
    let blocks = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| AdapterError::Parse {
            service: "Anthropic",
            message: "response has no content array".to_string(),
        })?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(AdapterError::Parse {
            service: "Anthropic",
            message: "response contains no text blocks".to_string(),
        });
    }
    Ok(text.join("\n"))
}
