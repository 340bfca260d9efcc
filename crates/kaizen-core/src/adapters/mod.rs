//! I/O adapters used by the workflow steps.
//!
//! Each external service sits behind a trait so the workflow can be driven
//! with in-memory fakes. HTTP-backed implementations share a [`RetryPolicy`].

pub mod files;
pub mod github;
pub mod llm;
pub mod retry;
pub mod search;

pub use files::{ContentCollector, GlobFileReader, NO_MATCHES};
pub use github::{Comment, DisabledIssueTracker, GitHubClient, GitHubConfig, Issue, IssueTracker, NewIssue};
pub use llm::{AnthropicClient, AnthropicConfig, LlmClient};
pub use retry::RetryPolicy;
pub use search::{SearchOptions, SearchProvider, SearchResponse, SearchResult, TavilyClient};
