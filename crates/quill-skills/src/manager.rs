use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::builtin::builtin_skills;
use crate::context::{ExecutionDetails, SkillContext, SkillResult, StepResults};
use crate::hybrid::run_hybrid;
use crate::resolve::resolve_map;
use crate::skill::{
    ResultFormat, ResultProcessing, Skill, SkillCategory, SkillDefinition, SkillParameter,
};
use crate::step::Backends;
use crate::store::SkillStore;
use crate::template::{fill, string_form};
use crate::validate::validate;
use crate::workflow::run_workflow;
use quill_core::{QuillError, Result};

/// Hybrid skills may nest this deep before execution is refused.
pub const MAX_SKILL_DEPTH: usize = 16;

/// The skill registry and dispatcher.
///
/// Holds every registered skill, persists the collection after each
/// mutation when a store is attached, and executes skills against its
/// [`Backends`]. Mutations take `&mut self`; execution only borrows, so one
/// manager can serve any number of sequential or interleaved runs.
pub struct SkillManager {
    skills: HashMap<String, Skill>,
    store: Option<SkillStore>,
    backends: Backends,
}

/// What a variant executor hands back to `execute`.
struct Dispatched {
    output: Value,
    steps: usize,
    intermediate: Option<StepResults>,
}

impl SkillManager {
    /// An in-memory registry with no persistence.
    pub fn new(backends: Backends) -> Self {
        Self {
            skills: HashMap::new(),
            store: None,
            backends,
        }
    }

    /// A registry backed by `store`, preloaded with its contents.
    ///
    /// Every stored skill is loaded, including ones written before the
    /// current checks existed. Those stay in the registry (and on disk) but
    /// fail at `execute` until they are fixed or removed.
    pub fn with_store(backends: Backends, store: SkillStore) -> Result<Self> {
        let mut skills = HashMap::new();
        for skill in store.load()? {
            let errors = validate(&skill);
            if !errors.is_empty() {
                warn!(
                    skill = %skill.id,
                    errors = ?errors,
                    "stored skill is invalid and will not execute"
                );
            }
            skills.insert(skill.id.clone(), skill);
        }
        Ok(Self {
            skills,
            store: Some(store),
            backends,
        })
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn store(&self) -> Option<&SkillStore> {
        self.store.as_ref()
    }

    // ── Registry ───────────────────────────────────────────────

    /// Validate and add a skill, then persist.
    pub fn register(&mut self, skill: Skill) -> Result<()> {
        let errors = validate(&skill);
        if !errors.is_empty() {
            return Err(QuillError::Validation(errors));
        }
        if self.skills.contains_key(&skill.id) {
            return Err(QuillError::AlreadyExists(skill.id));
        }

        info!(skill = %skill.id, name = %skill.name, kind = skill.definition.kind(), "skill registered");
        self.skills.insert(skill.id.clone(), skill);
        self.persist()
    }

    /// Remove a disabled skill and persist. Returns the removed skill.
    pub fn unregister(&mut self, id: &str) -> Result<Skill> {
        let skill = self
            .skills
            .get(id)
            .ok_or_else(|| QuillError::NotFound(id.to_string()))?;
        if skill.enabled {
            return Err(QuillError::Conflict(format!(
                "skill {id} is enabled, disable it first"
            )));
        }

        let removed = self
            .skills
            .remove(id)
            .ok_or_else(|| QuillError::NotFound(id.to_string()))?;
        info!(skill = id, "skill unregistered");
        self.persist()?;
        Ok(removed)
    }

    pub fn enable(&mut self, id: &str) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable(&mut self, id: &str) -> Result<()> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let skill = self
            .skills
            .get_mut(id)
            .ok_or_else(|| QuillError::NotFound(id.to_string()))?;
        skill.enabled = enabled;
        debug!(skill = id, enabled, "skill toggled");
        self.persist()
    }

    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.skills.get(id)
    }

    /// All skills, sorted by id.
    pub fn list(&self) -> Vec<&Skill> {
        let mut skills: Vec<_> = self.skills.values().collect();
        skills.sort_by(|a, b| a.id.cmp(&b.id));
        skills
    }

    pub fn list_by_category(&self, category: SkillCategory) -> Vec<&Skill> {
        self.list()
            .into_iter()
            .filter(|s| s.category == category)
            .collect()
    }

    /// Case-insensitive substring search over name, description and tags.
    pub fn search(&self, query: &str) -> Vec<&Skill> {
        self.list().into_iter().filter(|s| s.matches(query)).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Violations that would make `register` reject `skill`.
    pub fn validate(&self, skill: &Skill) -> Vec<String> {
        validate(skill)
    }

    /// Register a skill from a plain document. `id`, `name` and `definition`
    /// are required; everything else takes its default.
    pub fn import(&mut self, document: Value) -> Result<Skill> {
        let missing: Vec<String> = ["id", "name", "definition"]
            .into_iter()
            .filter(|key| document.get(key).is_none_or(Value::is_null))
            .map(|key| format!("skill document is missing {key}"))
            .collect();
        if !missing.is_empty() {
            return Err(QuillError::Validation(missing));
        }

        let skill: Skill = serde_json::from_value(document)?;
        self.register(skill.clone())?;
        Ok(skill)
    }

    /// The plain-document form of a registered skill.
    pub fn export(&self, id: &str) -> Result<Value> {
        let skill = self
            .skills
            .get(id)
            .ok_or_else(|| QuillError::NotFound(id.to_string()))?;
        Ok(serde_json::to_value(skill)?)
    }

    /// Register the shipped skill library, skipping ids already present.
    /// Returns the ids that were added.
    pub fn register_builtin_skills(&mut self) -> Result<Vec<String>> {
        let mut added = Vec::new();
        for skill in builtin_skills() {
            if self.skills.contains_key(&skill.id) {
                continue;
            }
            let errors = validate(&skill);
            if !errors.is_empty() {
                return Err(QuillError::Validation(errors));
            }
            added.push(skill.id.clone());
            self.skills.insert(skill.id.clone(), skill);
        }
        if !added.is_empty() {
            info!(count = added.len(), "registered builtin skills");
            self.persist()?;
        }
        Ok(added)
    }

    fn persist(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(self.list()),
            None => Ok(()),
        }
    }

    // ── Execution ──────────────────────────────────────────────

    /// Execute a skill. Never fails: every error becomes a failed
    /// [`SkillResult`]. Each top-level call runs inside its own
    /// `skill_execution` span so nested sub-skill logs can be correlated.
    pub async fn execute(&self, id: &str, ctx: &mut SkillContext) -> SkillResult {
        let span = info_span!("skill_execution", skill = id, execution = %Uuid::new_v4());
        self.execute_nested(id, ctx, 0).instrument(span).await
    }

    pub(crate) fn execute_nested<'a>(
        &'a self,
        id: &'a str,
        ctx: &'a mut SkillContext,
        depth: usize,
    ) -> BoxFuture<'a, SkillResult> {
        async move {
            let Some(skill) = self.skills.get(id) else {
                return SkillResult::failed(QuillError::NotFound(id.to_string()).to_string());
            };
            if !skill.enabled {
                return SkillResult::failed(QuillError::NotEnabled(id.to_string()).to_string());
            }
            if depth > MAX_SKILL_DEPTH {
                return SkillResult::failed(QuillError::RecursionLimit { depth }.to_string());
            }
            let errors = validate(skill);
            if !errors.is_empty() {
                return SkillResult::failed(QuillError::Validation(errors).to_string());
            }

            info!(skill = %id, kind = skill.definition.kind(), depth, "executing skill");
            let started = Instant::now();
            let tokens_before = ctx.state.tokens_used;
            ctx.state.step_outputs.clear();

            let outcome = self.dispatch(skill, ctx, depth).await;

            let tokens = ctx.state.tokens_used.saturating_sub(tokens_before);
            let mut details = ExecutionDetails {
                steps_executed: 0,
                execution_time: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                tokens_used: (tokens > 0).then_some(tokens),
            };

            match outcome {
                Ok(done) => {
                    details.steps_executed = done.steps;
                    debug!(skill = %id, ms = details.execution_time, "skill succeeded");
                    let result = SkillResult::ok(done.output, details);
                    match done.intermediate {
                        Some(results) => result.with_intermediate(results),
                        None => result,
                    }
                }
                Err(e) => {
                    details.steps_executed = ctx.state.step_outputs.len();
                    ctx.state.step_outputs.clear();
                    warn!(skill = %id, error = %e, "skill execution failed");
                    SkillResult::failed(e.to_string()).with_details(details)
                }
            }
        }
        .boxed()
    }

    async fn dispatch(
        &self,
        skill: &Skill,
        ctx: &mut SkillContext,
        depth: usize,
    ) -> Result<Dispatched> {
        apply_parameters(skill.parameters(), &mut ctx.input)?;

        match &skill.definition {
            SkillDefinition::Prompt(prompt) => {
                let filled = fill(&prompt.template, &ctx.input);
                let out = self
                    .backends
                    .generate(
                        ctx,
                        &filled,
                        prompt.system_prompt.as_deref(),
                        prompt.model.as_ref(),
                    )
                    .await?;
                ctx.state.tokens_used += out.tokens;
                Ok(Dispatched {
                    output: out.value,
                    steps: 1,
                    intermediate: None,
                })
            }
            SkillDefinition::Workflow(workflow) => {
                let mut results = StepResults::new();
                let outcome = run_workflow(&self.backends, workflow, ctx, &mut results).await;
                ctx.state.step_outputs = results;
                let output = outcome?;
                let results = std::mem::take(&mut ctx.state.step_outputs);
                Ok(Dispatched {
                    output,
                    steps: results.len(),
                    intermediate: Some(results),
                })
            }
            SkillDefinition::Tool(tool) => {
                let params = resolve_map(&tool.parameter_mapping, &ctx.input, &Map::new());
                let raw = self.backends.call_tool(ctx, &tool.tool, params).await?;
                let output = match &tool.result_processing {
                    Some(processing) => process_result(raw, processing)?,
                    None => raw,
                };
                Ok(Dispatched {
                    output,
                    steps: 1,
                    intermediate: None,
                })
            }
            SkillDefinition::Hybrid(hybrid) => {
                let output = run_hybrid(self, hybrid, ctx, depth).await?;
                Ok(Dispatched {
                    output,
                    steps: hybrid.skills.len(),
                    intermediate: None,
                })
            }
        }
    }
}

/// Fill in parameter defaults and reject missing required parameters.
/// A `null` input counts as missing.
fn apply_parameters(parameters: &[SkillParameter], input: &mut Map<String, Value>) -> Result<()> {
    for param in parameters {
        if input.get(&param.name).is_some_and(|v| !v.is_null()) {
            continue;
        }
        match (&param.default, param.required) {
            (Some(default), _) => {
                input.insert(param.name.clone(), default.clone());
            }
            (None, true) => return Err(QuillError::MissingParameter(param.name.clone())),
            (None, false) => {}
        }
    }
    Ok(())
}

/// Post-process a tool skill's raw result.
pub fn process_result(result: Value, processing: &ResultProcessing) -> Result<Value> {
    Ok(match processing.format {
        ResultFormat::Raw => result,
        ResultFormat::Text => Value::String(string_form(&result)),
        ResultFormat::Json => Value::String(serde_json::to_string_pretty(&result)?),
        ResultFormat::Markdown => match (&processing.template, &result) {
            (Some(template), Value::Object(data)) => Value::String(fill(template, data)),
            (Some(template), _) => Value::String(fill(template, &Map::new())),
            (None, _) => Value::String(string_form(&result)),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::ParameterType;
    use serde_json::json;

    #[test]
    fn defaults_fill_gaps_and_required_is_enforced() {
        let params = vec![
            SkillParameter::required("topic", "t", ParameterType::String),
            SkillParameter::optional("style", "s", "general"),
        ];

        let mut input = json!({ "topic": "rust" }).as_object().cloned().unwrap();
        apply_parameters(&params, &mut input).unwrap();
        assert_eq!(input["style"], "general");

        let mut explicit = json!({ "topic": "rust", "style": "terse" }).as_object().cloned().unwrap();
        apply_parameters(&params, &mut explicit).unwrap();
        assert_eq!(explicit["style"], "terse");

        let mut missing = json!({ "topic": null }).as_object().cloned().unwrap();
        let err = apply_parameters(&params, &mut missing).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: topic");
    }

    #[test]
    fn result_processing_formats() {
        let result = json!({ "words": 3, "lines": 1 });
        let processing = |format, template: Option<&str>| ResultProcessing {
            format,
            template: template.map(str::to_string),
        };

        assert_eq!(process_result(result.clone(), &processing(ResultFormat::Raw, None)).unwrap(), result);
        assert_eq!(
            process_result(json!(12), &processing(ResultFormat::Text, None)).unwrap(),
            json!("12")
        );
        assert_eq!(
            process_result(json!({ "a": 1 }), &processing(ResultFormat::Json, None)).unwrap(),
            json!("{\n  \"a\": 1\n}")
        );
        assert_eq!(
            process_result(
                result.clone(),
                &processing(ResultFormat::Markdown, Some("**{{words}}** words, {{missing}}"))
            )
            .unwrap(),
            json!("**3** words, {{missing}}")
        );
        assert_eq!(
            process_result(json!("plain"), &processing(ResultFormat::Markdown, None)).unwrap(),
            json!("plain")
        );
    }
}
