//! Sequential workflow runner.
//!
//! Steps run in declaration order. Dependencies are checked lazily: when the
//! runner reaches a step, every id in its `dependsOn` must already have an
//! entry in the results map, otherwise the step fails with `dependency not
//! met`. Each completed step stores its output under its own id and reports
//! progress as `(completed, total, step name)`.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::{SkillContext, StepResults};
use crate::skill::{ErrorPolicy, ExecutionMode, WorkflowSkill, WorkflowStep};
use crate::step::{Backends, StepOutput, execute_step};
use quill_core::{LogLevel, QuillError, Result};

/// Extra attempts per step under `onError: retry` when `maxRetries` is unset.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Run `workflow` and return the last step's output.
///
/// `results` receives each step's output as it completes; on failure it holds
/// whatever finished before the error. Tokens spent are added to
/// `ctx.state.tokens_used`.
pub async fn run_workflow(
    backends: &Backends,
    workflow: &WorkflowSkill,
    ctx: &mut SkillContext,
    results: &mut StepResults,
) -> Result<Value> {
    if workflow.mode != ExecutionMode::Sequential {
        ctx.log(
            LogLevel::Warn,
            &format!(
                "workflow mode {:?} is not supported, running steps sequentially",
                workflow.mode
            ),
        );
    }

    let total = workflow.steps.len();
    for step in &workflow.steps {
        ctx.state.current_step = Some(step.id.clone());

        match run_step(backends, workflow, step, ctx, results).await {
            Ok(output) => {
                ctx.state.tokens_used += output.tokens;
                results.insert(step.id.clone(), output.value);
                debug!(step = %step.id, completed = results.len(), total, "workflow step completed");
                ctx.report_progress(results.len(), total, &step.name);
            }
            Err(e) if workflow.on_error == ErrorPolicy::Continue => {
                ctx.log(
                    LogLevel::Warn,
                    &format!("step {} failed, continuing: {e}", step.id),
                );
            }
            Err(e) => {
                warn!(step = %step.id, error = %e, "workflow aborted");
                return Err(e);
            }
        }
    }
    ctx.state.current_step = None;

    let output = workflow
        .steps
        .last()
        .and_then(|last| results.get(&last.id))
        .cloned()
        .unwrap_or(Value::Null);
    info!(steps = results.len(), total, "workflow finished");
    Ok(output)
}

/// Check dependencies, then execute with the workflow's retry budget.
async fn run_step(
    backends: &Backends,
    workflow: &WorkflowSkill,
    step: &WorkflowStep,
    ctx: &SkillContext,
    results: &StepResults,
) -> Result<StepOutput> {
    if let Some(missing) = step.depends_on.iter().find(|dep| !results.contains_key(*dep)) {
        return Err(QuillError::DependencyNotMet(missing.clone()));
    }

    let retries = match workflow.on_error {
        ErrorPolicy::Retry => workflow.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        ErrorPolicy::Stop | ErrorPolicy::Continue => 0,
    };

    let mut attempt = 0;
    loop {
        match execute_step(backends, step, ctx, results).await {
            Ok(output) => return Ok(output),
            Err(e) if attempt < retries && is_retryable(&e) => {
                attempt += 1;
                ctx.log(
                    LogLevel::Warn,
                    &format!("step {} failed ({e}), retry {attempt}/{retries}", step.id),
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Failures that a second attempt cannot change are not retried.
fn is_retryable(error: &QuillError) -> bool {
    !matches!(
        error,
        QuillError::UnsupportedStep(_)
            | QuillError::DependencyNotMet(_)
            | QuillError::ServiceUnavailable(_)
            | QuillError::ToolNotFound(_)
            | QuillError::PluginNotEnabled(_)
    )
}
