//! `kaizen run`: research, analyze and report on one domain.

use std::sync::Arc;

use kaizen_core::adapters::{
    AnthropicClient, AnthropicConfig, DisabledIssueTracker, GitHubClient, GitHubConfig,
    GlobFileReader, IssueTracker, TavilyClient,
};
use kaizen_core::workflow::{load_config, KaizenReport};
use kaizen_core::{ConfigError, KaizenClients, KaizenWorkflow, WorkflowInput};

use super::CommandResult;
use crate::RunArgs;

pub async fn run(args: RunArgs) -> CommandResult {
    let config = load_config(&args.config)?;
    let input = WorkflowInput::for_domain(
        &config,
        &args.domain_id,
        args.content_base.clone(),
        args.dry_run,
    )?;
    let workflow = KaizenWorkflow::new(build_clients(&args)?)?;

    tracing::info!(
        domain = %input.domain.id,
        content_base = %input.content_base.display(),
        dry_run = input.dry_run,
        "starting analysis"
    );
    let run = workflow.run(&input).await?;

    print!("{}", summarize(&run.report));
    println!("Analysis completed successfully.");
    Ok(())
}

/// Construct the production adapters from CLI/env settings.
///
/// Search and LLM keys are always required. GitHub settings may be omitted
/// in dry-run mode, where the tracker is never written to.
pub fn build_clients(args: &RunArgs) -> Result<KaizenClients, ConfigError> {
    let search = TavilyClient::new(args.tavily_api_key.clone().unwrap_or_default())?;

    let mut llm_config = AnthropicConfig::new(args.anthropic_api_key.clone().unwrap_or_default());
    llm_config.base_url = args.anthropic_base_url.clone();
    llm_config.model = args.model.clone();
    let llm = AnthropicClient::new(llm_config)?;

    let github = GitHubClient::new(GitHubConfig::new(
        args.github_token.clone().unwrap_or_default(),
        args.issue_repo.clone().unwrap_or_default(),
    ));
    let issues: Arc<dyn IssueTracker> = match github {
        Ok(client) => Arc::new(client),
        Err(e) if args.dry_run => {
            tracing::info!("{}; issue tracker disabled for dry run", e);
            Arc::new(DisabledIssueTracker)
        }
        Err(e) => return Err(e),
    };

    Ok(KaizenClients {
        search: Arc::new(search),
        llm: Arc::new(llm),
        issues,
        files: Arc::new(GlobFileReader),
    })
}

/// Human-readable outcome printed after a run.
pub fn summarize(report: &KaizenReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Search query: {}\n", report.research.search_query));
    out.push_str(&format!("Sources kept: {}\n", report.research.sources.len()));
    for source in report.research.sources.iter().take(5) {
        out.push_str(&format!("  - {} ({})\n", source.title, source.url));
    }
    out.push_str(&format!("Issue: {}\n", report.issue_url));
    out
}
