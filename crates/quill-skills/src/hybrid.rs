//! Hybrid composition: run registered sub-skills in order and merge their
//! outputs.

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::SkillContext;
use crate::manager::SkillManager;
use crate::resolve::resolve_map;
use crate::skill::{HybridSkill, MergeStrategy, OrchestrationMode, ResultMerge, SubSkillRef};
use crate::template::fill;
use quill_core::{LogLevel, QuillError, Result};

/// Input for one sub-skill call: the mapping resolved against the parent
/// input, or the parent input as-is when no mapping is declared.
pub fn sub_skill_input(entry: &SubSkillRef, parent_input: &Map<String, Value>) -> Map<String, Value> {
    match &entry.parameter_mapping {
        Some(mapping) => resolve_map(mapping, parent_input, &Map::new()),
        None => parent_input.clone(),
    }
}

/// Run every sub-skill; the first failure aborts the rest.
pub(crate) async fn run_hybrid(
    manager: &SkillManager,
    hybrid: &HybridSkill,
    ctx: &mut SkillContext,
    depth: usize,
) -> Result<Value> {
    if hybrid.orchestration.mode != OrchestrationMode::Sequential {
        ctx.log(
            LogLevel::Warn,
            &format!(
                "orchestration mode {:?} is not supported, running sub-skills sequentially",
                hybrid.orchestration.mode
            ),
        );
    }

    let mut outputs = Vec::with_capacity(hybrid.skills.len());
    for (index, entry) in hybrid.skills.iter().enumerate() {
        let mut child = ctx.fork(sub_skill_input(entry, &ctx.input));
        ctx.state.current_step = Some(entry.skill_id.clone());
        ctx.report_progress(index, hybrid.skills.len(), &entry.skill_id);

        let result = manager
            .execute_nested(&entry.skill_id, &mut child, depth + 1)
            .await;
        ctx.state.tokens_used += result.tokens_used();

        if !result.success {
            return Err(QuillError::SubSkillFailed {
                skill: entry.skill_id.clone(),
                reason: result.error.unwrap_or_default(),
            });
        }

        let output = result.output.unwrap_or(Value::Null);
        debug!(sub_skill = %entry.skill_id, "sub-skill completed");
        let key = entry.alias.as_deref().unwrap_or(&entry.skill_id);
        ctx.state.variables.insert(key.to_string(), output.clone());
        outputs.push(output);
    }
    ctx.state.current_step = None;

    Ok(merge_results(outputs, hybrid.result_merge.as_ref()))
}

/// Combine sub-skill outputs. Without a merge config the outputs come back as
/// an ordered list.
pub fn merge_results(outputs: Vec<Value>, merge: Option<&ResultMerge>) -> Value {
    let Some(merge) = merge else {
        return Value::Array(outputs);
    };

    match merge.strategy {
        MergeStrategy::Append => {
            let mut flat = Vec::new();
            for output in outputs {
                match output {
                    Value::Array(items) => flat.extend(items),
                    other => flat.push(other),
                }
            }
            Value::Array(flat)
        }
        MergeStrategy::Merge => {
            let mut merged = Map::new();
            for output in outputs {
                if let Value::Object(map) = output {
                    merged.extend(map);
                }
            }
            Value::Object(merged)
        }
        MergeStrategy::Template => match &merge.template {
            Some(template) => {
                let mut data = Map::new();
                data.insert("results".into(), Value::Array(outputs));
                Value::String(fill(template, &data))
            }
            None => Value::Array(outputs),
        },
        MergeStrategy::Custom => Value::Array(outputs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn merge(strategy: MergeStrategy, template: Option<&str>) -> ResultMerge {
        ResultMerge {
            strategy,
            template: template.map(str::to_string),
        }
    }

    #[test]
    fn append_flattens_one_level() {
        let out = merge_results(
            vec![json!(["a", "b"]), json!(["c"])],
            Some(&merge(MergeStrategy::Append, None)),
        );
        assert_eq!(out, json!(["a", "b", "c"]));
    }

    #[test]
    fn append_keeps_scalars_and_nested_arrays() {
        let out = merge_results(
            vec![json!("x"), json!([["y"]])],
            Some(&merge(MergeStrategy::Append, None)),
        );
        assert_eq!(out, json!(["x", ["y"]]));
    }

    #[test]
    fn merge_is_shallow_and_later_wins() {
        let out = merge_results(
            vec![json!({ "a": 1, "b": { "x": 1 } }), json!("ignored"), json!({ "b": 2 })],
            Some(&merge(MergeStrategy::Merge, None)),
        );
        assert_eq!(out, json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn template_receives_results_list() {
        let out = merge_results(
            vec![json!("one"), json!("two")],
            Some(&merge(MergeStrategy::Template, Some("All: {{results}}"))),
        );
        assert_eq!(out, json!("All: one,two"));
    }

    #[test]
    fn custom_and_absent_return_raw_list() {
        let outputs = vec![json!(1), json!([2])];
        assert_eq!(merge_results(outputs.clone(), None), json!([1, [2]]));
        assert_eq!(
            merge_results(outputs, Some(&merge(MergeStrategy::Custom, None))),
            json!([1, [2]])
        );
    }

    #[test]
    fn mapping_resolves_against_parent_input_only() {
        let parent = json!({ "text": "hello", "lang": "en" }).as_object().cloned().unwrap();
        let entry = SubSkillRef::new("child").with_mapping(
            json!({ "content": "$text", "fixed": 3, "missing": "$nope" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(
            Value::Object(sub_skill_input(&entry, &parent)),
            json!({ "content": "hello", "fixed": 3, "missing": "$nope" })
        );
        assert_eq!(sub_skill_input(&SubSkillRef::new("child"), &parent), parent);
    }
}
