//! Prompt and issue text construction.
//!
//! Templates are embedded markdown rendered with minijinja. The helpers below
//! format research sources and pull sections back out of the model response.

use chrono::{DateTime, Datelike, Utc};
use minijinja::{context, Environment};

use super::config::DomainConfig;
use super::steps::{AnalysisOutput, ResearchOutput};
use crate::adapters::SearchResult;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const USER_TEMPLATE: &str = include_str!("prompts/user.md");
const ISSUE_BODY_TEMPLATE: &str = include_str!("prompts/issue_body.md");
const ISSUE_COMMENT_TEMPLATE: &str = include_str!("prompts/issue_comment.md");

pub const ISSUE_TITLE_PREFIX: &str = "[Dotfiles Kaizen]";
const MAX_SOURCES: usize = 5;
const SOURCE_EXCERPT_CHARS: usize = 200;

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)?;
        env.add_template("user", USER_TEMPLATE)?;
        env.add_template("issue_body", ISSUE_BODY_TEMPLATE)?;
        env.add_template("issue_comment", ISSUE_COMMENT_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn system_prompt(&self) -> Result<String, minijinja::Error> {
        self.env.get_template("system")?.render(context! {})
    }

    pub fn user_prompt(
        &self,
        domain: &DomainConfig,
        research: &ResearchOutput,
        current_content: &str,
        year: i32,
    ) -> Result<String, minijinja::Error> {
        let analysis = &domain.analysis_context;
        self.env.get_template("user")?.render(context! {
            domain => domain,
            current_version => analysis.current_version.as_deref().unwrap_or("unknown"),
            priority_aspects => analysis.priority_aspects.join(", "),
            year => year,
            summary => research.summary.as_str(),
            sources => format_sources(&research.sources),
            content => current_content,
        })
    }

    pub fn issue_body(
        &self,
        domain: &DomainConfig,
        research: &ResearchOutput,
        analysis: &AnalysisOutput,
        now: DateTime<Utc>,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("issue_body")?.render(context! {
            domain_name => domain.name.as_str(),
            timestamp => now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            search_query => research.search_query.as_str(),
            summary => research.summary.as_str(),
            full_response => analysis.full_response.as_str(),
            sources => format_sources_list(&research.sources),
        })
    }

    pub fn issue_comment(
        &self,
        research: &ResearchOutput,
        analysis: &AnalysisOutput,
        now: DateTime<Utc>,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("issue_comment")?.render(context! {
            date => now.format("%Y-%m-%d").to_string(),
            summary => research.summary.as_str(),
            full_response => analysis.full_response.as_str(),
        })
    }
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

/// `"[Dotfiles Kaizen] {name}"`, used to find an open issue for the domain.
pub fn issue_title_prefix(domain_name: &str) -> String {
    format!("{} {}", ISSUE_TITLE_PREFIX, domain_name)
}

pub fn issue_title(domain_name: &str, now: DateTime<Utc>) -> String {
    format!("{} - {}", issue_title_prefix(domain_name), now.format("%Y-%m-%d"))
}

/// Current year, as used in search queries and prompts.
pub fn current_year(now: DateTime<Utc>) -> i32 {
    now.year()
}

/// Sources for the analysis prompt: `- {title}: {excerpt}`.
pub fn format_sources(sources: &[SearchResult]) -> String {
    sources
        .iter()
        .take(MAX_SOURCES)
        .map(|s| {
            let mut excerpt: String = s.content.chars().take(SOURCE_EXCERPT_CHARS).collect();
            if s.content.chars().count() > SOURCE_EXCERPT_CHARS {
                excerpt.push_str("...");
            }
            format!("- {}: {}", s.title, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sources for the issue body: `- [title](url)`.
pub fn format_sources_list(sources: &[SearchResult]) -> String {
    sources
        .iter()
        .take(MAX_SOURCES)
        .map(|s| format!("- [{}]({})", s.title, s.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Body of the `## {name}` section, up to the next level-2 header.
pub fn extract_section(text: &str, section_name: &str) -> String {
    let header = format!("## {}", section_name);
    let Some(start) = text.find(&header) else {
        return String::new();
    };
    let rest = &text[start + header.len()..];
    match rest.find("\n## ") {
        Some(end) => rest[..end].trim().to_string(),
        None => rest.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(i: usize, content: &str) -> SearchResult {
        SearchResult {
            title: format!("Source {}", i),
            url: format!("https://example.com/{}", i),
            content: content.to_string(),
            score: 0.9,
        }
    }

    fn domain() -> DomainConfig {
        serde_json::from_value(serde_json::json!({
            "id": "zsh",
            "name": "Zsh",
            "description": "Shell startup files",
            "target_files": [".zshrc"],
            "analysis_context": { "priority_aspects": ["speed", "safety"] }
        }))
        .unwrap()
    }

    fn research() -> ResearchOutput {
        ResearchOutput {
            summary: "Lazy-load plugins.".to_string(),
            sources: vec![source(1, "zinit turbo mode")],
            search_query: "zsh config startup 2026".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 7, 30, 0).unwrap()
    }

    #[test]
    fn format_sources_truncates_long_content() {
        let long = "x".repeat(250);
        let formatted = format_sources(&[source(1, &long), source(2, "short")]);
        let lines: Vec<&str> = formatted.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("- Source 1: {}...", "x".repeat(200)));
        assert_eq!(lines[1], "- Source 2: short");
    }

    #[test]
    fn format_sources_keeps_at_most_five() {
        let sources: Vec<SearchResult> = (1..=7).map(|i| source(i, "c")).collect();
        assert_eq!(format_sources(&sources).lines().count(), 5);
        let list = format_sources_list(&sources);
        assert_eq!(list.lines().count(), 5);
        assert!(list.starts_with("- [Source 1](https://example.com/1)"));
        assert!(!list.contains("Source 6"));
    }

    #[test]
    fn extract_section_stops_at_next_header() {
        let text = "\n## Gap Analysis\nThis is the gap analysis content.\n\n## Recommendations\nThese are recommendations.\n";
        assert_eq!(extract_section(text, "Gap Analysis"), "This is the gap analysis content.");
        assert_eq!(extract_section(text, "Recommendations"), "These are recommendations.");
    }

    #[test]
    fn extract_section_keeps_subheaders() {
        let text = "## Recommendations\n### High Priority\n- [ ] a\n## References\n- x";
        assert_eq!(
            extract_section(text, "Recommendations"),
            "### High Priority\n- [ ] a"
        );
    }

    #[test]
    fn extract_section_missing_header_is_empty() {
        assert_eq!(extract_section("## Other Section\nContent", "Gap Analysis"), "");
    }

    #[test]
    fn titles_use_utc_date() {
        assert_eq!(issue_title_prefix("Zsh"), "[Dotfiles Kaizen] Zsh");
        assert_eq!(issue_title("Zsh", now()), "[Dotfiles Kaizen] Zsh - 2026-03-09");
        assert_eq!(current_year(now()), 2026);
    }

    #[test]
    fn system_prompt_lists_expected_sections() {
        let prompt = PromptEngine::new().unwrap().system_prompt().unwrap();
        for header in ["## Gap Analysis", "## Recommendations", "## Implementation Guide", "## References"] {
            assert!(prompt.contains(header), "missing {header}");
        }
    }

    #[test]
    fn user_prompt_includes_context_and_content() {
        let prompt = PromptEngine::new()
            .unwrap()
            .user_prompt(&domain(), &research(), "### File: .zshrc\n\nsetopt autocd", 2026)
            .unwrap();

        assert!(prompt.contains("Analyze the following domain: Zsh"));
        assert!(prompt.contains("Current version/state: unknown"));
        assert!(prompt.contains("Priorities: speed, safety"));
        assert!(prompt.contains("Latest Research Summary (2026)"));
        assert!(prompt.contains("- Source 1: zinit turbo mode"));
        assert!(prompt.contains("setopt autocd"));
    }

    #[test]
    fn issue_texts_carry_research_and_analysis() {
        let engine = PromptEngine::new().unwrap();
        let analysis = AnalysisOutput::from_response("## Gap Analysis\nNone.".to_string());

        let body = engine.issue_body(&domain(), &research(), &analysis, now()).unwrap();
        assert!(body.contains("- **Domain**: Zsh"));
        assert!(body.contains("- **Date**: 2026-03-09 07:30:00 UTC"));
        assert!(body.contains("`zsh config startup 2026`"));
        assert!(body.contains("- [Source 1](https://example.com/1)"));
        assert!(body.contains("## Gap Analysis\nNone."));

        let comment = engine.issue_comment(&research(), &analysis, now()).unwrap();
        assert!(comment.starts_with("### Update: 2026-03-09"));
        assert!(comment.contains("**Research Summary**:\nLazy-load plugins."));
    }
}
