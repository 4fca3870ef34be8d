//! Executors for the individual workflow step types.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::context::{SkillContext, StepResults};
use crate::resolve::{reference_name, resolve, resolve_map};
use crate::skill::{ModelConfig, StepConfig, ToolStepConfig, TransformStepConfig, WorkflowStep};
use crate::template::{fill, string_form};
use quill_core::{QuillError, Result, ToolRegistry};
use quill_llm::{GenerateOptions, GeneratorRouter};

/// The external collaborators skills execute against.
#[derive(Clone)]
pub struct Backends {
    pub generators: GeneratorRouter,
    pub tools: Arc<dyn ToolRegistry>,
}

impl Backends {
    pub fn new(generators: GeneratorRouter, tools: Arc<dyn ToolRegistry>) -> Self {
        Self { generators, tools }
    }

    /// Generate text for `prompt`. Provider and model fall back to the
    /// context's `aiConfig` when `model` leaves them unset.
    pub async fn generate(
        &self,
        ctx: &SkillContext,
        prompt: &str,
        system_prompt: Option<&str>,
        model: Option<&ModelConfig>,
    ) -> Result<StepOutput> {
        let provider = model
            .and_then(|m| m.provider.as_deref())
            .unwrap_or(ctx.ai_config.provider.as_str());
        let generator = self.generators.resolve(provider)?;

        let options = GenerateOptions {
            system_prompt: system_prompt.map(str::to_string),
            model: model
                .and_then(|m| m.model.clone())
                .or_else(|| ctx.ai_config.model.clone()),
            temperature: model.and_then(|m| m.temperature),
            max_tokens: model.and_then(|m| m.max_tokens),
        };

        debug!(provider = generator.name(), prompt_len = prompt.len(), "generating");
        let generation = generator.generate(prompt, &options).await?;
        Ok(StepOutput {
            value: Value::String(generation.text),
            tokens: generation
                .usage
                .map(|u| u64::from(u.total_tokens()))
                .unwrap_or(0),
        })
    }

    /// Invoke a tool with the context's AI config, environment and log sink.
    pub async fn call_tool(
        &self,
        ctx: &SkillContext,
        tool: &str,
        params: Map<String, Value>,
    ) -> Result<Value> {
        debug!(tool, params = params.len(), "calling tool");
        self.tools.invoke(tool, params, &ctx.tool_context()).await
    }
}

/// A step's output plus the tokens spent producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub value: Value,
    pub tokens: u64,
}

impl StepOutput {
    fn plain(value: Value) -> Self {
        Self { value, tokens: 0 }
    }
}

/// Run one step against the results collected so far.
pub async fn execute_step(
    backends: &Backends,
    step: &WorkflowStep,
    ctx: &SkillContext,
    results: &StepResults,
) -> Result<StepOutput> {
    match &step.config {
        StepConfig::Prompt(config) => {
            let data = merged_input(&ctx.input, results);
            let prompt = fill(&config.template, &data);
            backends.generate(ctx, &prompt, None, config.model.as_ref()).await
        }
        StepConfig::Tool(config) => {
            let params = tool_parameters(config, &ctx.input, results)?;
            let value = backends.call_tool(ctx, &config.tool, params).await?;
            Ok(StepOutput::plain(value))
        }
        StepConfig::Transform(config) => Ok(StepOutput::plain(run_transform(config, ctx, results))),
        StepConfig::Condition(_) | StepConfig::Loop(_) => {
            Err(QuillError::UnsupportedStep(step.config.step_type().to_string()))
        }
    }
}

/// Caller input overlaid with prior step outputs; outputs win on collision.
pub fn merged_input(input: &Map<String, Value>, results: &StepResults) -> Map<String, Value> {
    let mut data = input.clone();
    for (id, output) in results {
        data.insert(id.clone(), output.clone());
    }
    data
}

fn tool_parameters(
    config: &ToolStepConfig,
    input: &Map<String, Value>,
    results: &StepResults,
) -> Result<Map<String, Value>> {
    match &config.parameters {
        Value::Object(mapping) => Ok(resolve_map(mapping, input, results)),
        Value::Null => Ok(Map::new()),
        other => match resolve(other, input, results) {
            Value::Object(map) => Ok(map),
            _ => Err(QuillError::ToolExecution {
                tool: config.tool.clone(),
                reason: match reference_name(other) {
                    Some(name) => format!("parameters reference ${name} is not an object"),
                    None => "parameters must be an object".to_string(),
                },
            }),
        },
    }
}

fn run_transform(config: &TransformStepConfig, ctx: &SkillContext, results: &StepResults) -> Value {
    let value = resolve(&config.input, &ctx.input, results);
    apply_transform(&config.transform, value)
}

/// Apply a named transform. Unknown names are the identity.
pub fn apply_transform(name: &str, value: Value) -> Value {
    match name {
        "uppercase" => Value::String(string_form(&value).to_uppercase()),
        "lowercase" => Value::String(string_form(&value).to_lowercase()),
        "length" => Value::from(string_form(&value).chars().count()),
        "split" => Value::Array(
            string_form(&value)
                .split('\n')
                .map(|line| Value::String(line.to_string()))
                .collect(),
        ),
        "join" => match value {
            Value::Array(items) => Value::String(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Null => String::new(),
                        other => string_form(other),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            other => other,
        },
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transforms_follow_string_semantics() {
        assert_eq!(apply_transform("uppercase", json!("abc")), json!("ABC"));
        assert_eq!(apply_transform("lowercase", json!("ÄB")), json!("äb"));
        assert_eq!(apply_transform("length", json!("héllo")), json!(5));
        assert_eq!(apply_transform("length", json!(["a", "b"])), json!(3));
        assert_eq!(apply_transform("split", json!("a\nb\n")), json!(["a", "b", ""]));
        assert_eq!(apply_transform("join", json!(["a", "b"])), json!("a\nb"));
        assert_eq!(apply_transform("join", json!("not an array")), json!("not an array"));
        assert_eq!(apply_transform("reverse", json!({ "k": 1 })), json!({ "k": 1 }));
    }

    #[test]
    fn uppercase_of_number_uses_string_form() {
        assert_eq!(apply_transform("uppercase", json!(12)), json!("12"));
    }

    #[test]
    fn merged_input_prefers_step_outputs() {
        let input = json!({ "a": "input", "b": "input" }).as_object().cloned().unwrap();
        let results = json!({ "b": "step" }).as_object().cloned().unwrap();
        let merged = merged_input(&input, &results);
        assert_eq!(merged["a"], "input");
        assert_eq!(merged["b"], "step");
    }

    #[test]
    fn tool_parameters_accept_whole_object_reference() {
        let config = ToolStepConfig {
            tool: "t".into(),
            parameters: json!("$args"),
        };
        let results = json!({ "args": { "text": "hi" } }).as_object().cloned().unwrap();
        let params = tool_parameters(&config, &Map::new(), &results).unwrap();
        assert_eq!(params["text"], "hi");

        let bad = ToolStepConfig {
            tool: "t".into(),
            parameters: json!("$nothing"),
        };
        assert!(tool_parameters(&bad, &Map::new(), &Map::new()).is_err());
    }
}
