//! Step contract: a named unit of work with declared dependencies.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StepFailure;

/// The work a step performs.
///
/// `results` holds the outputs of every step that has completed so far in the
/// current run. A step only ever sees results of steps that actually finished.
#[async_trait]
pub trait Runnable<C>: Send + Sync {
    async fn execute(
        &self,
        input: &Value,
        ctx: &C,
        results: &StepResults,
    ) -> Result<Value, StepFailure>;
}

/// A named, immutable step registered in a flow.
pub struct Step<C> {
    name: String,
    depends_on: Vec<String>,
    runnable: Box<dyn Runnable<C>>,
}

impl<C: Sync + 'static> Step<C> {
    pub fn new(
        name: impl Into<String>,
        depends_on: &[&str],
        runnable: impl Runnable<C> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            depends_on: depends_on.iter().map(|dep| dep.to_string()).collect(),
            runnable: Box::new(runnable),
        }
    }

    /// Build a step from a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, depends_on: &[&str], f: F) -> Self
    where
        F: Fn(&Value, &C, &StepResults) -> Result<Value, StepFailure> + Send + Sync + 'static,
    {
        Self::new(name, depends_on, FnRunnable(f))
    }
}

impl<C> Step<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub(crate) fn runnable(&self) -> &dyn Runnable<C> {
        self.runnable.as_ref()
    }
}

impl<C> std::fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

struct FnRunnable<F>(F);

#[async_trait]
impl<C, F> Runnable<C> for FnRunnable<F>
where
    C: Sync,
    F: Fn(&Value, &C, &StepResults) -> Result<Value, StepFailure> + Send + Sync,
{
    async fn execute(
        &self,
        input: &Value,
        ctx: &C,
        results: &StepResults,
    ) -> Result<Value, StepFailure> {
        (self.0)(input, ctx, results)
    }
}

/// Error returned by the typed accessors of [`StepResults`].
#[derive(Debug, thiserror::Error)]
pub enum ResultAccessError {
    #[error("No result recorded for step '{0}'")]
    Missing(String),

    #[error("Result of step '{step}' has an unexpected shape: {source}")]
    Decode {
        step: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Results of the steps completed during one run, keyed by step name.
///
/// Values are type-erased JSON; consumers that know the flow shape use
/// [`StepResults::get_as`] to recover concrete types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResults {
    values: HashMap<String, Value>,
    order: Vec<String>,
}

impl StepResults {
    pub fn get(&self, step: &str) -> Option<&Value> {
        self.values.get(step)
    }

    /// Deserialize the result of `step` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, step: &str) -> Result<T, ResultAccessError> {
        let value = self
            .values
            .get(step)
            .ok_or_else(|| ResultAccessError::Missing(step.to_string()))?;
        T::deserialize(value).map_err(|source| ResultAccessError::Decode {
            step: step.to_string(),
            source,
        })
    }

    pub fn contains(&self, step: &str) -> bool {
        self.values.contains_key(step)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Step names in the order they completed.
    pub fn completion_order(&self) -> &[String] {
        &self.order
    }

    /// Iterate `(step, result)` pairs in completion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|value| (name.as_str(), value)))
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.values
    }

    pub(crate) fn insert(&mut self, step: String, value: Value) {
        if self.values.insert(step.clone(), value).is_none() {
            self.order.push(step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Research {
        sources: Vec<String>,
    }

    #[test]
    fn typed_accessor_decodes_result() {
        let mut results = StepResults::default();
        results.insert("research".to_string(), json!({"sources": ["a", "b"]}));

        let research: Research = results.get_as("research").expect("decode");
        assert_eq!(research.sources, vec!["a", "b"]);
    }

    #[test]
    fn typed_accessor_reports_missing_and_mismatched_results() {
        let mut results = StepResults::default();
        results.insert("research".to_string(), json!("plain text"));

        let missing = results.get_as::<Research>("analyze").unwrap_err();
        assert!(matches!(missing, ResultAccessError::Missing(ref s) if s == "analyze"));

        let mismatched = results.get_as::<Research>("research").unwrap_err();
        assert!(matches!(mismatched, ResultAccessError::Decode { .. }));
    }

    #[test]
    fn iteration_follows_completion_order() {
        let mut results = StepResults::default();
        results.insert("b".to_string(), json!(2));
        results.insert("a".to_string(), json!(1));

        let names: Vec<&str> = results.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn closure_steps_receive_input_and_context() {
        let step: Step<u32> = Step::from_fn("double", &[], |input, ctx, _results| {
            let n = input.as_u64().unwrap_or_default();
            Ok(json!(n * u64::from(*ctx)))
        });

        let out = step
            .runnable()
            .execute(&json!(21), &2, &StepResults::default())
            .await
            .expect("execute");
        assert_eq!(out, json!(42));
        assert!(step.depends_on().is_empty());
    }
}
