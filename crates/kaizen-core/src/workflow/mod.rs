//! Dotfiles Kaizen workflow: research → collect → analyze → report.
//!
//! # Architecture
//!
//! ```text
//! review config ──► WorkflowInput ──► Flow<KaizenContext>
//!                                        │
//!            research ─ collectContent ─ analyze ─ report
//!               │             │            │        │
//!         SearchProvider ContentCollector LlmClient IssueTracker
//! ```
//!
//! The flow output is a [`KaizenReport`]; the raw collected content stays in
//! [`KaizenRun::results`].

pub mod config;
pub mod prompt;
pub mod steps;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::{ContentCollector, IssueTracker, LlmClient, SearchProvider};
use crate::error::{ConfigError, FlowBuildError, FlowError};
use crate::flow::{Flow, JsonSchemaValidator, SchemaError, Step, StepResults};

pub use config::{load_config, AnalysisContext, DomainConfig, GlobalSettings, ReviewConfig, SearchHints};
pub use prompt::PromptEngine;
pub use steps::{AnalysisOutput, ResearchOutput, ANALYZE, COLLECT_CONTENT, REPORT, RESEARCH};

pub const FLOW_ID: &str = "dotfiles-kaizen";

const INPUT_SCHEMA: &str = include_str!("../../schemas/workflow_input.schema.json");
const OUTPUT_SCHEMA: &str = include_str!("../../schemas/kaizen_report.schema.json");

/// Validated input of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub domain: DomainConfig,
    pub settings: GlobalSettings,
    /// Directory the domain's `target_files` patterns are resolved against.
    pub content_base: PathBuf,
    pub dry_run: bool,
}

impl WorkflowInput {
    pub fn for_domain(
        config: &ReviewConfig,
        domain_id: &str,
        content_base: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            domain: config.require_domain(domain_id)?.clone(),
            settings: config.global_settings.clone(),
            content_base: content_base.into(),
            dry_run,
        })
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// External services the steps talk to.
#[derive(Clone)]
pub struct KaizenClients {
    pub search: Arc<dyn SearchProvider>,
    pub llm: Arc<dyn LlmClient>,
    pub issues: Arc<dyn IssueTracker>,
    pub files: Arc<dyn ContentCollector>,
}

/// Execution context shared by all steps of one run.
pub struct KaizenContext {
    pub search: Arc<dyn SearchProvider>,
    pub llm: Arc<dyn LlmClient>,
    pub issues: Arc<dyn IssueTracker>,
    pub files: Arc<dyn ContentCollector>,
    /// Fixed for the run so titles, dates and the search year agree.
    pub now: DateTime<Utc>,
}

impl KaizenContext {
    pub fn new(clients: &KaizenClients, now: DateTime<Utc>) -> Self {
        Self {
            search: Arc::clone(&clients.search),
            llm: Arc::clone(&clients.llm),
            issues: Arc::clone(&clients.issues),
            files: Arc::clone(&clients.files),
            now,
        }
    }
}

/// Final output of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KaizenReport {
    pub research: ResearchOutput,
    pub analysis: AnalysisOutput,
    /// Issue URL, or `DRY-RUN: {title}` in dry-run mode.
    pub issue_url: String,
}

#[derive(Debug, Clone)]
pub struct KaizenRun {
    pub report: KaizenReport,
    pub results: StepResults,
}

impl KaizenRun {
    /// Text gathered by `collectContent`.
    pub fn collected_content(&self) -> Option<&str> {
        self.results.get(COLLECT_CONTENT).and_then(Value::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Build(#[from] FlowBuildError),

    #[error("Invalid embedded schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid prompt template: {0}")]
    Prompt(#[from] minijinja::Error),

    #[error("Failed to encode workflow input: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Unexpected workflow output: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Assemble the four-step flow with its schemas.
pub fn build_flow(prompts: Arc<PromptEngine>) -> Result<Flow<KaizenContext>, WorkflowError> {
    let flow = Flow::builder(FLOW_ID)
        .input_schema(JsonSchemaValidator::from_json(INPUT_SCHEMA)?)
        .output_schema(JsonSchemaValidator::from_json(OUTPUT_SCHEMA)?)
        .step(Step::new(RESEARCH, &[], steps::ResearchStep))
        .step(Step::new(COLLECT_CONTENT, &[RESEARCH], steps::CollectContentStep))
        .step(Step::new(
            ANALYZE,
            &[RESEARCH, COLLECT_CONTENT],
            steps::AnalyzeStep::new(Arc::clone(&prompts)),
        ))
        .step(Step::new(
            REPORT,
            &[RESEARCH, ANALYZE],
            steps::ReportStep::new(prompts),
        ))
        .build_output(|results| {
            json!({
                "research": results.get(RESEARCH),
                "analysis": results.get(ANALYZE),
                "issueUrl": results.get(REPORT),
            })
        })
        .build()?;
    Ok(flow)
}

/// The review workflow bound to a set of clients.
pub struct KaizenWorkflow {
    flow: Flow<KaizenContext>,
    clients: KaizenClients,
}

impl KaizenWorkflow {
    pub fn new(clients: KaizenClients) -> Result<Self, WorkflowError> {
        let prompts = Arc::new(PromptEngine::new()?);
        Ok(Self {
            flow: build_flow(prompts)?,
            clients,
        })
    }

    pub fn flow(&self) -> &Flow<KaizenContext> {
        &self.flow
    }

    pub async fn run(&self, input: &WorkflowInput) -> Result<KaizenRun, WorkflowError> {
        self.run_at(input, Utc::now()).await
    }

    /// Run with an explicit clock.
    pub async fn run_at(
        &self,
        input: &WorkflowInput,
        now: DateTime<Utc>,
    ) -> Result<KaizenRun, WorkflowError> {
        let value = serde_json::to_value(input).map_err(WorkflowError::Encode)?;
        let ctx = KaizenContext::new(&self.clients, now);
        let run = self.flow.run(value, &ctx).await?;
        let report = KaizenReport::deserialize(&run.output).map_err(WorkflowError::Decode)?;
        Ok(KaizenRun {
            report,
            results: run.results,
        })
    }
}
