//! Flow engine: runs a fixed set of named steps in dependency order.
//!
//! Execution order is resolved dynamically: the engine sweeps the declared
//! steps in declaration order, running every step whose dependencies have all
//! completed, and repeats the sweep until every step has run. A sweep is called
//! a pass. If more than `2 × N` passes go by (N = number of declared steps) with
//! steps still outstanding, the remaining steps can never become ready and the
//! run fails with [`FlowError::CircularDependency`]. That covers true cycles as
//! well as dependencies on steps that were never declared.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, info_span, Instrument};

use crate::error::{FlowBuildError, FlowError};
use crate::flow::schema::SchemaValidator;
use crate::flow::step::{Step, StepResults};

/// Aggregates completed step results into the flow output.
pub type OutputBuilder = Box<dyn Fn(&StepResults) -> Value + Send + Sync>;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRun {
    /// Final output, validated against the output schema when one is declared.
    pub output: Value,
    /// Every step result of this run, for callers that need intermediate values.
    pub results: StepResults,
}

/// A configured set of steps plus their schemas and output aggregation.
pub struct Flow<C> {
    id: String,
    input_schema: Option<Box<dyn SchemaValidator>>,
    output_schema: Option<Box<dyn SchemaValidator>>,
    steps: Vec<Step<C>>,
    build_output: Option<OutputBuilder>,
}

/// Builder for [`Flow`].
pub struct FlowBuilder<C> {
    id: String,
    input_schema: Option<Box<dyn SchemaValidator>>,
    output_schema: Option<Box<dyn SchemaValidator>>,
    steps: Vec<Step<C>>,
    build_output: Option<OutputBuilder>,
}

impl<C> FlowBuilder<C> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_schema: None,
            output_schema: None,
            steps: Vec::new(),
            build_output: None,
        }
    }

    pub fn input_schema(mut self, schema: impl SchemaValidator + 'static) -> Self {
        self.input_schema = Some(Box::new(schema));
        self
    }

    pub fn output_schema(mut self, schema: impl SchemaValidator + 'static) -> Self {
        self.output_schema = Some(Box::new(schema));
        self
    }

    /// Append a step. Declaration order is the order steps are scanned in.
    pub fn step(mut self, step: Step<C>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build_output(
        mut self,
        build: impl Fn(&StepResults) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.build_output = Some(Box::new(build));
        self
    }

    pub fn build(self) -> Result<Flow<C>, FlowBuildError> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(FlowBuildError::DuplicateStep {
                    flow_id: self.id.clone(),
                    step: step.name().to_string(),
                });
            }
        }
        Ok(Flow {
            id: self.id,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
            steps: self.steps,
            build_output: self.build_output,
        })
    }
}

impl<C: Sync> Flow<C> {
    pub fn builder(id: impl Into<String>) -> FlowBuilder<C> {
        FlowBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared steps, in declaration order.
    pub fn steps(&self) -> &[Step<C>] {
        &self.steps
    }

    /// Execute every step once, in dependency order.
    pub async fn run(&self, input: Value, ctx: &C) -> Result<FlowRun, FlowError> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("flow", flow_id = %self.id, %run_id);
        self.run_inner(input, ctx).instrument(span).await
    }

    async fn run_inner(&self, input: Value, ctx: &C) -> Result<FlowRun, FlowError> {
        if let Some(schema) = &self.input_schema {
            schema
                .validate(&input)
                .map_err(|source| FlowError::InputValidation {
                    flow_id: self.id.clone(),
                    source,
                })?;
        }

        let total = self.steps.len();
        let max_passes = total * 2;
        let mut results = StepResults::default();
        let mut executed: HashSet<&str> = HashSet::with_capacity(total);
        let mut passes = 0usize;

        info!(steps = total, "starting flow");

        while executed.len() < total {
            passes += 1;
            if passes > max_passes {
                return Err(self.circular_dependency(&executed, passes - 1));
            }

            let mut completed_this_pass = 0usize;
            for step in &self.steps {
                if executed.contains(step.name()) || !is_ready(step, &executed) {
                    continue;
                }

                debug!(step = step.name(), pass = passes, "running step");
                let value = step
                    .runnable()
                    .execute(&input, ctx, &results)
                    .await
                    .map_err(|source| FlowError::StepExecution {
                        flow_id: self.id.clone(),
                        step: step.name().to_string(),
                        source,
                    })?;

                results.insert(step.name().to_string(), value);
                executed.insert(step.name());
                completed_this_pass += 1;
            }
            debug!(pass = passes, completed = completed_this_pass, "pass finished");
        }

        let output = match &self.build_output {
            Some(build) => build(&results),
            None => self
                .steps
                .last()
                .and_then(|step| results.get(step.name()).cloned())
                .unwrap_or(Value::Null),
        };

        if let Some(schema) = &self.output_schema {
            schema
                .validate(&output)
                .map_err(|source| FlowError::OutputValidation {
                    flow_id: self.id.clone(),
                    source,
                })?;
        }

        info!(steps = total, passes, "flow completed");
        Ok(FlowRun { output, results })
    }

    /// Dry-run the scheduler: the steps that would run in each pass.
    ///
    /// Uses the same readiness scan and pass bound as [`Flow::run`] without
    /// invoking any step.
    pub fn execution_plan(&self) -> Result<Vec<Vec<String>>, FlowError> {
        let total = self.steps.len();
        let max_passes = total * 2;
        let mut executed: HashSet<&str> = HashSet::with_capacity(total);
        let mut plan = Vec::new();
        let mut passes = 0usize;

        while executed.len() < total {
            passes += 1;
            if passes > max_passes {
                return Err(self.circular_dependency(&executed, passes - 1));
            }

            let mut wave = Vec::new();
            for step in &self.steps {
                if executed.contains(step.name()) || !is_ready(step, &executed) {
                    continue;
                }
                executed.insert(step.name());
                wave.push(step.name().to_string());
            }
            if !wave.is_empty() {
                plan.push(wave);
            }
        }
        Ok(plan)
    }

    fn circular_dependency(&self, executed: &HashSet<&str>, passes: usize) -> FlowError {
        let declared: HashSet<&str> = self.steps.iter().map(|s| s.name()).collect();
        let pending: Vec<&Step<C>> = self
            .steps
            .iter()
            .filter(|s| !executed.contains(s.name()))
            .collect();

        let mut unknown: Vec<String> = Vec::new();
        for step in &pending {
            for dep in step.depends_on() {
                if !declared.contains(dep.as_str()) && !unknown.contains(dep) {
                    unknown.push(dep.clone());
                }
            }
        }

        FlowError::CircularDependency {
            flow_id: self.id.clone(),
            pending: pending.iter().map(|s| s.name().to_string()).collect(),
            unknown,
            passes,
        }
    }
}

fn is_ready<C>(step: &Step<C>, executed: &HashSet<&str>) -> bool {
    step.depends_on()
        .iter()
        .all(|dep| executed.contains(dep.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowErrorKind;
    use crate::flow::schema::JsonSchemaValidator;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records invocation order across steps.
    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
    }

    impl Journal {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn recording(name: &'static str, deps: &[&str]) -> Step<Journal> {
        Step::from_fn(name, deps, move |_input, journal: &Journal, results| {
            journal.calls.lock().unwrap().push(name.to_string());
            Ok(json!({ "step": name, "seen": results.len() }))
        })
    }

    fn failing(name: &'static str, deps: &[&str]) -> Step<Journal> {
        Step::from_fn(name, deps, move |_input, journal: &Journal, _results| {
            journal.calls.lock().unwrap().push(name.to_string());
            Err("search provider unavailable".into())
        })
    }

    #[tokio::test]
    async fn runs_each_step_once_after_its_dependencies() {
        // Declared in reverse so the scheduler has to defer every step.
        let flow = Flow::builder("diamond")
            .step(recording("report", &["analyze", "research"]))
            .step(recording("analyze", &["collect", "research"]))
            .step(recording("collect", &["research"]))
            .step(recording("research", &[]))
            .build()
            .expect("build");
        let journal = Journal::default();

        let run = flow.run(json!({}), &journal).await.expect("run");

        let calls = journal.calls();
        assert_eq!(calls, vec!["research", "collect", "analyze", "report"]);
        assert_eq!(run.results.completion_order(), calls.as_slice());
        for step in flow.steps() {
            let pos = calls.iter().position(|c| c == step.name()).unwrap();
            for dep in step.depends_on() {
                let dep_pos = calls.iter().position(|c| c == dep).unwrap();
                assert!(dep_pos < pos, "{} ran before its dependency {}", step.name(), dep);
            }
        }
    }

    #[tokio::test]
    async fn ready_steps_in_one_pass_run_in_declared_order() {
        let flow = Flow::builder("fan-out")
            .step(recording("b", &["root"]))
            .step(recording("a", &["root"]))
            .step(recording("root", &[]))
            .build()
            .expect("build");
        let journal = Journal::default();

        flow.run(json!(null), &journal).await.expect("run");

        // Pass 1 only reaches `root`; pass 2 finds `b` then `a`.
        assert_eq!(journal.calls(), vec!["root", "b", "a"]);
        assert_eq!(
            flow.execution_plan().expect("plan"),
            vec![vec!["root".to_string()], vec!["b".to_string(), "a".to_string()]]
        );
    }

    #[tokio::test]
    async fn dependency_order_within_a_step_is_irrelevant() {
        let flow = Flow::builder("set")
            .step(recording("x", &[]))
            .step(recording("y", &[]))
            .step(recording("z", &["y", "x"]))
            .build()
            .expect("build");
        let journal = Journal::default();

        flow.run(json!(null), &journal).await.expect("run");
        assert_eq!(journal.calls(), vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn cycle_fails_instead_of_looping() {
        let flow = Flow::builder("cycle")
            .step(recording("a", &["b"]))
            .step(recording("b", &["a"]))
            .build()
            .expect("build");
        let journal = Journal::default();

        let err = flow.run(json!(null), &journal).await.unwrap_err();

        assert_eq!(err.kind(), FlowErrorKind::CircularDependency);
        match err {
            FlowError::CircularDependency {
                pending,
                unknown,
                passes,
                ..
            } => {
                assert_eq!(pending, vec!["a", "b"]);
                assert!(unknown.is_empty());
                assert_eq!(passes, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(journal.calls().is_empty());
    }

    #[tokio::test]
    async fn undeclared_dependency_is_reported_as_circular() {
        let flow = Flow::builder("dangling")
            .step(recording("research", &[]))
            .step(recording("report", &["missing"]))
            .build()
            .expect("build");
        let journal = Journal::default();

        let err = flow.run(json!(null), &journal).await.unwrap_err();

        assert_eq!(err.kind(), FlowErrorKind::CircularDependency);
        assert!(err.to_string().contains("undeclared dependencies: missing"));
        // Steps that could run did run before the bound was hit.
        assert_eq!(journal.calls(), vec!["research"]);
        assert!(flow.execution_plan().is_err());
    }

    #[tokio::test]
    async fn invalid_input_stops_before_any_step() {
        let schema = JsonSchemaValidator::from_value(&json!({
            "type": "object",
            "required": ["query"]
        }))
        .expect("schema");
        let flow = Flow::builder("guarded")
            .input_schema(schema)
            .step(recording("research", &[]))
            .build()
            .expect("build");
        let journal = Journal::default();

        let err = flow.run(json!({"other": 1}), &journal).await.unwrap_err();

        assert_eq!(err.kind(), FlowErrorKind::InputValidation);
        assert!(err.to_string().contains("Invalid input for flow 'guarded'"));
        assert!(journal.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_output_is_reported_after_all_steps_ran() {
        let schema = JsonSchemaValidator::from_value(&json!({"type": "string"})).expect("schema");
        let flow = Flow::builder("shaped")
            .output_schema(schema)
            .step(recording("research", &[]))
            .step(recording("report", &["research"]))
            .build_output(|results| json!({ "count": results.len() }))
            .build()
            .expect("build");
        let journal = Journal::default();

        let err = flow.run(json!(null), &journal).await.unwrap_err();

        assert_eq!(err.kind(), FlowErrorKind::OutputValidation);
        assert_eq!(journal.calls(), vec!["research", "report"]);
    }

    #[tokio::test]
    async fn step_failure_names_the_step_and_skips_dependents() {
        let flow = Flow::builder("failing")
            .step(recording("research", &[]))
            .step(failing("analyze", &["research"]))
            .step(recording("report", &["analyze"]))
            .build()
            .expect("build");
        let journal = Journal::default();

        let err = flow.run(json!(null), &journal).await.unwrap_err();

        assert_eq!(err.kind(), FlowErrorKind::StepExecution);
        assert_eq!(err.step(), Some("analyze"));
        let cause = std::error::Error::source(&err).expect("cause");
        assert_eq!(cause.to_string(), "search provider unavailable");
        assert_eq!(journal.calls(), vec!["research", "analyze"]);
    }

    #[tokio::test]
    async fn default_output_is_last_declared_step() {
        // `first` is declared last but completes first.
        let flow = Flow::builder("default-output")
            .step(Step::from_fn("second", &["first"], |_, _: &Journal, _| {
                Ok(json!("second"))
            }))
            .step(Step::from_fn("first", &[], |_, _: &Journal, _| Ok(json!("first"))))
            .build()
            .expect("build");

        let run = flow.run(json!(null), &Journal::default()).await.expect("run");

        assert_eq!(run.output, json!("first"));
        assert_eq!(run.results.completion_order(), ["first", "second"]);
    }

    #[tokio::test]
    async fn each_run_starts_with_fresh_results() {
        let flow = Flow::builder("fresh")
            .step(recording("only", &[]))
            .build()
            .expect("build");
        let journal = Journal::default();

        let first = flow.run(json!(null), &journal).await.expect("first");
        let second = flow.run(json!(null), &journal).await.expect("second");

        assert_eq!(first.output, json!({"step": "only", "seen": 0}));
        assert_eq!(second.output, first.output);
        assert_eq!(journal.calls(), vec!["only", "only"]);
    }

    #[tokio::test]
    async fn filter_pipeline_reports_dry_run_count() {
        #[derive(Default)]
        struct Settings {
            dry_run: bool,
        }

        let flow = Flow::builder("filter-pipeline")
            .step(Step::from_fn("research", &[], |input, _: &Settings, _| {
                Ok(json!({ "sources": input["sources"].clone() }))
            }))
            .step(Step::from_fn("filter", &["research"], |_, _: &Settings, results| {
                let research = results.get("research").cloned().unwrap_or_default();
                let kept: Vec<Value> = research["sources"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|s| !s["title"].as_str().unwrap_or("").contains("Ignore"))
                    .collect();
                Ok(json!({ "sources": kept }))
            }))
            .step(Step::from_fn("report", &["filter"], |_, settings: &Settings, results| {
                let count = results
                    .get("filter")
                    .and_then(|f| f["sources"].as_array().map(Vec::len))
                    .unwrap_or(0);
                if settings.dry_run {
                    return Ok(json!(format!("DRY-RUN: {count}")));
                }
                Err("reporting requires dry run in this test".into())
            }))
            .build_output(|results| {
                json!({
                    "sources": results.get("filter").map(|f| f["sources"].clone()),
                    "report": results.get("report").cloned(),
                })
            })
            .build()
            .expect("build");

        let run = flow
            .run(
                json!({ "sources": [{"title": "A"}, {"title": "Ignore"}] }),
                &Settings { dry_run: true },
            )
            .await
            .expect("run");

        assert_eq!(run.output["sources"].as_array().map(Vec::len), Some(1));
        assert_eq!(run.output["report"], json!("DRY-RUN: 1"));
    }

    #[test]
    fn duplicate_step_names_are_rejected() {
        let err = Flow::<Journal>::builder("dupes")
            .step(recording("research", &[]))
            .step(recording("research", &[]))
            .build()
            .err()
            .expect("duplicate rejected");
        assert!(matches!(err, FlowBuildError::DuplicateStep { ref step, .. } if step == "research"));
    }

    #[tokio::test]
    async fn empty_flow_produces_null_output() {
        let flow = Flow::<Journal>::builder("empty").build().expect("build");
        let run = flow.run(json!({"x": 1}), &Journal::default()).await.expect("run");
        assert_eq!(run.output, Value::Null);
        assert!(run.results.is_empty());
    }
}
