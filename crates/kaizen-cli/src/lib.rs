//! Kaizen CLI: run the dotfiles review workflow from the command line.
//!
//! The binary is a thin shell over [`commands`]; argument types live here so
//! integration tests can parse and drive them directly.

pub mod commands;
pub mod env;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kaizen_core::adapters::llm::{ANTHROPIC_BASE_URL, DEFAULT_MODEL};

/// Dotfiles Kaizen: research-driven review of dotfiles
#[derive(Parser, Debug)]
#[command(name = "kaizen", version, about = "Dotfiles Kaizen: research-driven review of dotfiles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research, analyze and report on one review domain
    Run(RunArgs),

    /// Parse a review config and list its domains
    Validate {
        /// Path to the review config (JSON, or YAML by extension)
        #[arg(long)]
        config: PathBuf,
    },

    /// Print the workflow steps in execution order (no network)
    Plan,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// ID of the domain to analyze
    #[arg(long)]
    pub domain_id: String,

    /// Path to the review config
    #[arg(long)]
    pub config: PathBuf,

    /// Base directory for reading target files
    #[arg(long, default_value = ".")]
    pub content_base: PathBuf,

    /// Repository (owner/name) where issues are created
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub issue_repo: Option<String>,

    /// GitHub token used for issue search and creation
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Tavily API key used for the research search
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: Option<String>,

    /// Anthropic API key used for the analysis
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic-compatible API base URL
    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = ANTHROPIC_BASE_URL)]
    pub anthropic_base_url: String,

    /// Model ID
    #[arg(long, env = "KAIZEN_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Build the report but do not touch the issue tracker
    #[arg(long)]
    pub dry_run: bool,
}
