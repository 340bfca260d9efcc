//! The four steps of the review workflow.
//!
//! ```text
//! research ──► collectContent ──► analyze ──► report
//!     └────────────────────────────┴──────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::config::SearchHints;
use super::prompt::{current_year, extract_section, issue_title, issue_title_prefix, PromptEngine};
use super::{KaizenContext, WorkflowInput};
use crate::adapters::{NewIssue, SearchOptions, SearchResult};
use crate::error::StepFailure;
use crate::flow::{Runnable, StepResults};

pub const RESEARCH: &str = "research";
pub const COLLECT_CONTENT: &str = "collectContent";
pub const ANALYZE: &str = "analyze";
pub const REPORT: &str = "report";

pub const NO_SUMMARY: &str = "No summary available.";
pub const DRY_RUN_PREFIX: &str = "DRY-RUN: ";

/// Result of the `research` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOutput {
    pub summary: String,
    pub sources: Vec<SearchResult>,
    pub search_query: String,
}

/// Result of the `analyze` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub gap_analysis: String,
    pub recommendations: String,
    pub implementation_guide: String,
    pub full_response: String,
}

impl AnalysisOutput {
    pub fn from_response(full_response: String) -> Self {
        Self {
            gap_analysis: extract_section(&full_response, "Gap Analysis"),
            recommendations: extract_section(&full_response, "Recommendations"),
            implementation_guide: extract_section(&full_response, "Implementation Guide"),
            full_response,
        }
    }
}

/// `"{keywords} {focus areas} {year}"`
pub fn build_search_query(hints: &SearchHints, year: i32) -> String {
    format!(
        "{} {} {}",
        hints.primary_keywords.join(" "),
        hints.focus_areas.join(" "),
        year
    )
}

/// Drop results whose title or content mentions an excluded term.
pub fn filter_excluded(results: Vec<SearchResult>, exclude_terms: &[String]) -> Vec<SearchResult> {
    let terms: Vec<String> = exclude_terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    results
        .into_iter()
        .filter(|r| {
            let title = r.title.to_lowercase();
            let content = r.content.to_lowercase();
            !terms
                .iter()
                .any(|term| title.contains(term.as_str()) || content.contains(term.as_str()))
        })
        .collect()
}

/// Phase 1: trend collection through the search provider.
pub struct ResearchStep;

#[async_trait]
impl Runnable<KaizenContext> for ResearchStep {
    async fn execute(
        &self,
        input: &Value,
        ctx: &KaizenContext,
        _results: &StepResults,
    ) -> Result<Value, StepFailure> {
        let input = WorkflowInput::from_value(input)?;
        let hints = &input.domain.search_hints;
        let query = build_search_query(hints, current_year(ctx.now));
        info!(domain = %input.domain.name, %query, "Phase 1: trend collection");

        let options = SearchOptions {
            max_results: input.settings.max_search_results,
            include_domains: hints.include_domains.clone(),
            exclude_domains: hints.exclude_domains.clone(),
        };
        let response = ctx.search.search(&query, &options).await?;

        let found = response.results.len();
        let sources = filter_excluded(response.results, &hints.exclude_terms);
        info!(found, kept = sources.len(), "search results filtered");

        let output = ResearchOutput {
            summary: response
                .answer
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| NO_SUMMARY.to_string()),
            sources,
            search_query: query,
        };
        Ok(serde_json::to_value(output)?)
    }
}

/// Reads the domain's target files under the content base.
pub struct CollectContentStep;

#[async_trait]
impl Runnable<KaizenContext> for CollectContentStep {
    async fn execute(
        &self,
        input: &Value,
        ctx: &KaizenContext,
        _results: &StepResults,
    ) -> Result<Value, StepFailure> {
        let input = WorkflowInput::from_value(input)?;
        let content = ctx
            .files
            .collect(&input.domain.target_files, &input.content_base)
            .await?;
        info!(bytes = content.len(), "collected current content");
        Ok(Value::String(content))
    }
}

/// Phase 2: analysis by the LLM.
pub struct AnalyzeStep {
    prompts: Arc<PromptEngine>,
}

impl AnalyzeStep {
    pub fn new(prompts: Arc<PromptEngine>) -> Self {
        Self { prompts }
    }
}

#[async_trait]
impl Runnable<KaizenContext> for AnalyzeStep {
    async fn execute(
        &self,
        input: &Value,
        ctx: &KaizenContext,
        results: &StepResults,
    ) -> Result<Value, StepFailure> {
        let input = WorkflowInput::from_value(input)?;
        let research: ResearchOutput = results.get_as(RESEARCH)?;
        let content: String = results.get_as(COLLECT_CONTENT)?;
        info!(domain = %input.domain.name, "Phase 2: analysis");

        let system = self.prompts.system_prompt()?;
        let user = self.prompts.user_prompt(
            &input.domain,
            &research,
            &content,
            current_year(ctx.now),
        )?;
        let response = ctx
            .llm
            .generate(&system, &user, input.settings.analysis_temperature)
            .await?;

        Ok(serde_json::to_value(AnalysisOutput::from_response(response))?)
    }
}

/// Phase 3: report findings as a new issue or a comment on the open one.
pub struct ReportStep {
    prompts: Arc<PromptEngine>,
}

impl ReportStep {
    pub fn new(prompts: Arc<PromptEngine>) -> Self {
        Self { prompts }
    }
}

#[async_trait]
impl Runnable<KaizenContext> for ReportStep {
    async fn execute(
        &self,
        input: &Value,
        ctx: &KaizenContext,
        results: &StepResults,
    ) -> Result<Value, StepFailure> {
        let input = WorkflowInput::from_value(input)?;
        let domain = &input.domain;
        let research: ResearchOutput = results.get_as(RESEARCH)?;
        let analysis: AnalysisOutput = results.get_as(ANALYZE)?;
        info!(domain = %domain.name, dry_run = input.dry_run, "Phase 3: reporting");

        let title = issue_title(&domain.name, ctx.now);
        if input.dry_run {
            info!(%title, "dry run, skipping issue tracker");
            return Ok(Value::String(format!("{}{}", DRY_RUN_PREFIX, title)));
        }

        if let Some(existing) = ctx
            .issues
            .find_existing_issue(&issue_title_prefix(&domain.name))
            .await
        {
            info!(
                "Found existing issue #{}. Adding comment instead.",
                existing.number
            );
            let comment = self.prompts.issue_comment(&research, &analysis, ctx.now)?;
            ctx.issues.add_comment(existing.number, &comment).await?;
            return Ok(Value::String(existing.html_url));
        }

        let mut labels = input.settings.issue_labels.clone();
        labels.push(domain.id.clone());
        let issue = NewIssue {
            title,
            body: self.prompts.issue_body(domain, &research, &analysis, ctx.now)?,
            labels,
        };
        let created = ctx.issues.create_issue(&issue).await?;
        Ok(Value::String(created.html_url))
    }
}
