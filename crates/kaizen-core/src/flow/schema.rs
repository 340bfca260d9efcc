//! Schema validation attached to flow inputs and outputs.
//!
//! The engine only needs the [`SchemaValidator`] capability. The stock
//! implementation compiles a JSON Schema with `jsonschema` and reports every
//! violation it finds.

use serde_json::Value;

/// Structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable summary.
    pub message: String,
    /// One entry per violation, in validator order.
    pub details: Vec<String>,
}

impl ValidationError {
    pub fn new(details: Vec<String>) -> Self {
        let message = match details.as_slice() {
            [] => "schema validation failed".to_string(),
            [only] => format!("schema validation failed: {}", only),
            many => format!(
                "schema validation failed with {} errors: {}",
                many.len(),
                many.join("; ")
            ),
        };
        Self { message, details }
    }
}

/// Validates a value against a declared shape.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), ValidationError>;
}

/// Failure to turn a schema document into a validator.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to parse schema JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to compile schema: {0}")]
    Compile(String),
}

/// [`SchemaValidator`] backed by a compiled JSON Schema.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compile a schema given as a JSON value.
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Parse and compile a schema document.
    pub fn from_json(raw: &str) -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(raw)?;
        Self::from_value(&schema)
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let details: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect();
        if details.is_empty() {
            return Ok(());
        }
        Err(ValidationError::new(details))
    }
}
