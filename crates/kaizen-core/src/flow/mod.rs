//! Dependency-ordered step execution.
//!
//! A [`Flow`] is a set of uniquely named [`Step`]s, optional input/output
//! schemas and an optional output aggregator. [`Flow::run`] validates the
//! input, runs each step once after all of its dependencies, then builds and
//! validates the output.

pub mod engine;
pub mod schema;
pub mod step;

pub use engine::{Flow, FlowBuilder, FlowRun, OutputBuilder};
pub use schema::{JsonSchemaValidator, SchemaError, SchemaValidator, ValidationError};
pub use step::{ResultAccessError, Runnable, Step, StepResults};
