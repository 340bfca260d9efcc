//! Web search provider (Tavily).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::retry::RetryPolicy;
use crate::error::{AdapterError, ConfigError};

pub const TAVILY_API_URL: &str = "https://api.tavily.com/search";

/// One hit returned by the search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// Provider answer plus ranked hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub max_results: u32,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, AdapterError>;
}

/// Tavily search API client.
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("TAVILY_API_KEY"));
        }
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            endpoint: TAVILY_API_URL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn payload(&self, query: &str, options: &SearchOptions) -> Value {
        json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": "advanced",
            "include_answer": true,
            "max_results": options.max_results,
            "include_domains": options.include_domains,
            "exclude_domains": options.exclude_domains,
        })
    }

    async fn send(&self, payload: &Value) -> Result<SearchResponse, AdapterError> {
        let response = self.client.post(&self.endpoint).json(payload).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AdapterError::Status {
                service: "Tavily",
                status: status.as_u16(),
                body: text,
            });
        }
        parse_response(&text)
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, AdapterError> {
        let payload = self.payload(query, options);
        info!(query, max_results = options.max_results, "searching Tavily");
        let payload = &payload;
        self.retry.run("Tavily API", move || self.send(payload)).await
    }
}

fn parse_response(text: &str) -> Result<SearchResponse, AdapterError> {
    serde_json::from_str(text).map_err(|e| AdapterError::Parse {
        service: "Tavily",
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = TavilyClient::new("  ").unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("TAVILY_API_KEY")));
    }

    #[test]
    fn payload_requests_advanced_search_with_answer() {
        let client = TavilyClient::new("tvly-key").expect("client");
        let options = SearchOptions {
            max_results: 10,
            include_domains: vec![],
            exclude_domains: vec!["pinterest.com".to_string()],
        };

        let payload = client.payload("rust async 2026", &options);

        assert_eq!(payload["api_key"], "tvly-key");
        assert_eq!(payload["search_depth"], "advanced");
        assert_eq!(payload["include_answer"], true);
        assert_eq!(payload["max_results"], 10);
        assert_eq!(payload["exclude_domains"], json!(["pinterest.com"]));
        assert_eq!(payload["include_domains"], json!([]));
    }

    #[test]
    fn parses_answer_and_results() {
        let body = r#"{
            "query": "q",
            "answer": "Use structured logging.",
            "results": [
                {"title": "A", "url": "https://a.dev", "content": "alpha", "score": 0.9},
                {"title": "B", "url": "https://b.dev", "content": "beta"}
            ]
        }"#;

        let parsed = parse_response(body).expect("parse");
        assert_eq!(parsed.answer.as_deref(), Some("Use structured logging."));
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].score, 0.0);
    }

    #[test]
    fn null_answer_is_none() {
        let parsed = parse_response(r#"{"answer": null, "results": []}"#).expect("parse");
        assert!(parsed.answer.is_none());
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let err = parse_response("<html>").unwrap_err();
        assert!(matches!(err, AdapterError::Parse { service: "Tavily", .. }));
    }
}
