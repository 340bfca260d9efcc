//! In-memory adapters and fixtures for exercising the workflow without network.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::adapters::{
    Comment, ContentCollector, Issue, IssueTracker, LlmClient, NewIssue, SearchOptions,
    SearchProvider, SearchResponse, SearchResult,
};
use crate::error::AdapterError;
use crate::workflow::{KaizenClients, ReviewConfig};

/// A model response containing every section the analysis step extracts.
pub const ANALYSIS_RESPONSE: &str = "## Gap Analysis\nPlugins load eagerly.\n\n## Recommendations\n### High Priority\n- [ ] Defer plugin loading\n\n## Implementation Guide\nUse zsh-defer.\n\n## References\n- https://example.com/fast-zsh";

/// Review config with a single `zsh` domain.
pub fn sample_config() -> ReviewConfig {
    ReviewConfig::from_json(
        r#"{
            "version": "1.0",
            "domains": [
                {
                    "id": "zsh",
                    "name": "Zsh",
                    "description": "Shell startup files",
                    "day_of_week": 1,
                    "target_files": ["zsh/**/*.zsh", ".zshrc"],
                    "search_hints": {
                        "primary_keywords": ["zsh", "config"],
                        "focus_areas": ["startup time"],
                        "exclude_terms": ["bash"],
                        "exclude_domains": ["pinterest.com"]
                    },
                    "analysis_context": {
                        "current_version": "5.9",
                        "priority_aspects": ["performance", "portability"]
                    }
                }
            ],
            "global_settings": {
                "max_search_results": 5,
                "analysis_temperature": 0.2,
                "issue_labels": ["dotfiles-kaizen", "shell"]
            }
        }"#,
    )
    .expect("sample config is valid")
}

pub fn clients(
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmClient>,
    issues: Arc<dyn IssueTracker>,
    files: Arc<dyn ContentCollector>,
) -> KaizenClients {
    KaizenClients {
        search,
        llm,
        issues,
        files,
    }
}

#[derive(Default)]
pub struct FakeSearch {
    response: Option<SearchResponse>,
    calls: Mutex<Vec<(String, SearchOptions)>>,
}

impl FakeSearch {
    pub fn answering(answer: Option<&str>, results: Vec<SearchResult>) -> Self {
        Self {
            response: Some(SearchResponse {
                answer: answer.map(str::to_string),
                results,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every search fails with a 503.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, SearchOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, AdapterError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), options.clone()));
        self.response.clone().ok_or(AdapterError::Status {
            service: "Tavily",
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

pub struct FakeLlm {
    reply: String,
    calls: Mutex<Vec<(String, String, f64)>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(system, user, temperature)` per call.
    pub fn calls(&self) -> Vec<(String, String, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push((
            system_prompt.to_string(),
            user_prompt.to_string(),
            temperature,
        ));
        Ok(self.reply.clone())
    }
}

/// Issue tracker that records every call. Created issues are numbered from 1.
#[derive(Default)]
pub struct FakeIssues {
    existing: Option<Issue>,
    searched: Mutex<Vec<String>>,
    created: Mutex<Vec<NewIssue>>,
    comments: Mutex<Vec<(u64, String)>>,
}

impl FakeIssues {
    pub fn with_existing(issue: Issue) -> Self {
        Self {
            existing: Some(issue),
            ..Self::default()
        }
    }

    pub fn searches(&self) -> usize {
        self.searched.lock().unwrap().len()
    }

    pub fn searched_prefixes(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewIssue> {
        self.created.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueTracker for FakeIssues {
    async fn find_existing_issue(&self, title_prefix: &str) -> Option<Issue> {
        self.searched.lock().unwrap().push(title_prefix.to_string());
        self.existing.clone()
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, AdapterError> {
        let mut created = self.created.lock().unwrap();
        created.push(issue.clone());
        let number = created.len() as u64;
        Ok(Issue {
            number,
            html_url: format!("https://github.com/me/dotfiles/issues/{}", number),
            title: issue.title.clone(),
        })
    }

    async fn add_comment(&self, issue_number: u64, body: &str) -> Result<Comment, AdapterError> {
        let mut comments = self.comments.lock().unwrap();
        comments.push((issue_number, body.to_string()));
        Ok(Comment {
            id: comments.len() as u64,
            html_url: format!(
                "https://github.com/me/dotfiles/issues/{}#issuecomment-{}",
                issue_number,
                comments.len()
            ),
        })
    }
}

/// Returns fixed content regardless of patterns.
pub struct FakeFiles {
    content: String,
}

impl FakeFiles {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

#[async_trait]
impl ContentCollector for FakeFiles {
    async fn collect(&self, _patterns: &[String], _base: &Path) -> Result<String, AdapterError> {
        Ok(self.content.clone())
    }
}
