//! `kaizen plan`: show the workflow steps in the order they will run.

use std::sync::Arc;

use kaizen_core::flow::Flow;
use kaizen_core::workflow::{build_flow, KaizenContext, PromptEngine};

use super::CommandResult;

pub fn run() -> CommandResult {
    let flow = build_flow(Arc::new(PromptEngine::new()?))?;
    print!("{}", render(&flow)?);
    Ok(())
}

pub fn render(flow: &Flow<KaizenContext>) -> Result<String, kaizen_core::FlowError> {
    let plan = flow.execution_plan()?;
    let mut out = format!("Flow '{}' ({} steps)\n", flow.id(), flow.steps().len());
    for (pass, names) in plan.iter().enumerate() {
        for name in names {
            let deps = flow
                .steps()
                .iter()
                .find(|s| s.name() == name.as_str())
                .map(|s| s.depends_on().join(", "))
                .unwrap_or_default();
            if deps.is_empty() {
                out.push_str(&format!("  pass {}: {}\n", pass + 1, name));
            } else {
                out.push_str(&format!("  pass {}: {} (after {})\n", pass + 1, name, deps));
            }
        }
    }
    Ok(out)
}
