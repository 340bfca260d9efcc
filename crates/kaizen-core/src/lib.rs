//! Kaizen Core: dependency-ordered flow engine and the dotfiles review workflow.
//!
//! - [`flow`]: generic engine that runs named async steps once each, after
//!   their dependencies, with optional JSON Schema checks on input and output.
//! - [`adapters`]: search, LLM, issue tracker and file collection behind traits.
//! - [`workflow`]: the research → collect → analyze → report pipeline built on
//!   both.

pub mod adapters;
pub mod error;
pub mod flow;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;

// Convenience re-exports
pub use error::{AdapterError, ConfigError, FlowBuildError, FlowError, FlowErrorKind, StepFailure};
pub use flow::{Flow, FlowBuilder, FlowRun, Step, StepResults};
pub use workflow::{KaizenClients, KaizenReport, KaizenRun, KaizenWorkflow, WorkflowError, WorkflowInput};
