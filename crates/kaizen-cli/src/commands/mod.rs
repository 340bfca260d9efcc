//! Subcommand implementations.

pub mod plan;
pub mod run;
pub mod validate;

/// Error returned by a subcommand; `main` prints it with its cause chain.
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;
pub type CommandResult = Result<(), CommandError>;
