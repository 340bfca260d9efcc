//! Error types for the Kaizen core.
//!
//! `FlowError` is the single error surfaced by [`Flow::run`](crate::flow::Flow::run).
//! Adapter and configuration failures have their own enums; when they happen
//! inside a step they reach the caller wrapped as `FlowError::StepExecution`.

use std::path::PathBuf;

use crate::flow::schema::ValidationError;

/// Boxed cause carried by a failing step.
pub type StepFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant of [`FlowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowErrorKind {
    InputValidation,
    OutputValidation,
    StepExecution,
    CircularDependency,
}

/// Failure of a single flow execution.
///
/// Every variant aborts the run; no partial results are returned.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid input for flow '{flow_id}': {source}")]
    InputValidation {
        flow_id: String,
        #[source]
        source: ValidationError,
    },

    #[error("Invalid output for flow '{flow_id}': {source}")]
    OutputValidation {
        flow_id: String,
        #[source]
        source: ValidationError,
    },

    #[error("Step '{step}' failed in flow '{flow_id}'")]
    StepExecution {
        flow_id: String,
        step: String,
        #[source]
        source: StepFailure,
    },

    #[error(
        "Circular dependency detected in flow '{flow_id}' after {passes} passes: {}",
        stalled_summary(.pending, .unknown)
    )]
    CircularDependency {
        flow_id: String,
        /// Steps that never became ready, in declaration order.
        pending: Vec<String>,
        /// Dependency names referenced by pending steps but not declared in the flow.
        unknown: Vec<String>,
        passes: usize,
    },
}

impl FlowError {
    pub fn kind(&self) -> FlowErrorKind {
        match self {
            FlowError::InputValidation { .. } => FlowErrorKind::InputValidation,
            FlowError::OutputValidation { .. } => FlowErrorKind::OutputValidation,
            FlowError::StepExecution { .. } => FlowErrorKind::StepExecution,
            FlowError::CircularDependency { .. } => FlowErrorKind::CircularDependency,
        }
    }

    /// Name of the failing step, for `StepExecution` errors.
    pub fn step(&self) -> Option<&str> {
        match self {
            FlowError::StepExecution { step, .. } => Some(step),
            _ => None,
        }
    }
}

fn stalled_summary(pending: &[String], unknown: &[String]) -> String {
    let mut summary = format!("steps [{}] never became ready", pending.join(", "));
    if !unknown.is_empty() {
        summary.push_str(&format!(" (undeclared dependencies: {})", unknown.join(", ")));
    }
    summary
}

/// Problems detected while assembling a flow, before any run.
#[derive(Debug, thiserror::Error)]
pub enum FlowBuildError {
    #[error("Duplicate step name '{step}' in flow '{flow_id}'")]
    DuplicateStep { flow_id: String, step: String },
}

/// Failure inside an I/O adapter (search provider, LLM, issue tracker, files).
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("{0} is not configured")]
    Disabled(&'static str),
}

/// Configuration and credential problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("Failed to read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Domain not found: {0}")]
    UnknownDomain(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_message_lists_undeclared_dependencies() {
        let err = FlowError::CircularDependency {
            flow_id: "demo".to_string(),
            pending: vec!["report".to_string()],
            unknown: vec!["missing".to_string()],
            passes: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("steps [report] never became ready"));
        assert!(msg.contains("undeclared dependencies: missing"));
        assert_eq!(err.kind(), FlowErrorKind::CircularDependency);
        assert_eq!(err.step(), None);
    }

    #[test]
    fn step_execution_exposes_cause() {
        use std::error::Error;

        let err = FlowError::StepExecution {
            flow_id: "demo".to_string(),
            step: "research".to_string(),
            source: Box::new(AdapterError::Status {
                service: "Tavily",
                status: 500,
                body: "boom".to_string(),
            }),
        };
        assert_eq!(err.step(), Some("research"));
        let cause = err.source().expect("cause");
        assert!(cause.to_string().contains("boom"));
    }
}
