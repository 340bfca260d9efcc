//! Issue tracker backed by the GitHub REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::retry::RetryPolicy;
use crate::error::{AdapterError, ConfigError};

pub const GITHUB_API_URL: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "dotfiles-kaizen";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub html_url: String,
}

/// Payload for a new issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// First open issue whose title contains `title_prefix`.
    ///
    /// Lookup failures are not fatal: implementations log and return `None`.
    async fn find_existing_issue(&self, title_prefix: &str) -> Option<Issue>;

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, AdapterError>;

    async fn add_comment(&self, issue_number: u64, body: &str) -> Result<Comment, AdapterError>;
}

/// Target repository and credentials.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// `owner/name`
    pub repository: String,
    pub api_url: String,
}

impl GitHubConfig {
    pub fn new(token: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            repository: repository.into(),
            api_url: GITHUB_API_URL.to_string(),
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    config: GitHubConfig,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, ConfigError> {
        if config.token.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GITHUB_TOKEN"));
        }
        if config.repository.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GITHUB_REPOSITORY"));
        }
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
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

    pub fn repository(&self) -> &str {
        &self.config.repository
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn search_query(&self, title_prefix: &str) -> String {
        format!(
            "repo:{} is:issue is:open in:title {}",
            self.config.repository, title_prefix
        )
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AdapterError> {
        let response = request
            .bearer_auth(&self.config.token)
            .header("Accept", ACCEPT)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AdapterError::Status {
                service: "GitHub",
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| AdapterError::Parse {
            service: "GitHub",
            message: e.to_string(),
        })
    }

    async fn search_issues(&self, title_prefix: &str) -> Result<Option<Issue>, AdapterError> {
        let request = self
            .client
            .get(self.url("/search/issues"))
            .query(&[("q", self.search_query(title_prefix))]);
        let page: Value = self.send(request).await?;
        first_search_hit(&page)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("repository", &self.config.repository)
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn find_existing_issue(&self, title_prefix: &str) -> Option<Issue> {
        match self.search_issues(title_prefix).await {
            Ok(found) => found,
            Err(e) => {
                warn!("GitHub API search error: {}", e);
                None
            }
        }
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, AdapterError> {
        let url = self.url(&format!("/repos/{}/issues", self.config.repository));
        let payload = json!({
            "title": issue.title,
            "body": issue.body,
            "labels": issue.labels,
            "assignees": [],
        });
        let (url, payload) = (&url, &payload);
        let created: Issue = self
            .retry
            .run("GitHub API", move || self.send(self.client.post(url).json(payload)))
            .await?;
        info!(number = created.number, url = %created.html_url, "created issue");
        Ok(created)
    }

    async fn add_comment(&self, issue_number: u64, body: &str) -> Result<Comment, AdapterError> {
        let url = self.url(&format!(
            "/repos/{}/issues/{}/comments",
            self.config.repository, issue_number
        ));
        let request = self.client.post(url).json(&json!({ "body": body }));
        let comment: Comment = self.send(request).await?;
        info!(issue_number, "comment added");
        Ok(comment)
    }
}

/// Tracker used when no repository is configured (dry runs).
///
/// Lookups find nothing; writes fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIssueTracker;

#[async_trait]
impl IssueTracker for DisabledIssueTracker {
    async fn find_existing_issue(&self, _title_prefix: &str) -> Option<Issue> {
        None
    }

    async fn create_issue(&self, _issue: &NewIssue) -> Result<Issue, AdapterError> {
        Err(AdapterError::Disabled("GitHub"))
    }

    async fn add_comment(&self, _issue_number: u64, _body: &str) -> Result<Comment, AdapterError> {
        Err(AdapterError::Disabled("GitHub"))
    }
}

fn first_search_hit(page: &Value) -> Result<Option<Issue>, AdapterError> {
    let total = page.get("total_count").and_then(Value::as_u64).unwrap_or(0);
    if total == 0 {
        return Ok(None);
    }
    let Some(first) = page.get("items").and_then(|items| items.get(0)) else {
        return Ok(None);
    };
    Issue::deserialize(first)
        .map(Some)
        .map_err(|e| AdapterError::Parse {
            service: "GitHub",
            message: e.to_string(),
        })
}
