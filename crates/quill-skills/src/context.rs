use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use quill_core::{AiConfig, Environment, LogLevel, LogSink, ToolContext, emit_log};

/// Step outputs keyed by step id.
pub type StepResults = Map<String, Value>;

/// Progress callback: `(current, total, message)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Mutable per-invocation state.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    /// Outputs of the workflow steps completed by the last run.
    pub step_outputs: StepResults,
    pub variables: Map<String, Value>,
    pub current_step: Option<String>,
    /// Tokens reported by the backend, summed over every generation call.
    pub tokens_used: u64,
}

/// Everything one skill invocation runs against.
#[derive(Clone)]
pub struct SkillContext {
    pub input: Map<String, Value>,
    pub environment: Environment,
    pub ai_config: AiConfig,
    pub state: ExecutionState,
    pub log: Option<LogSink>,
    pub progress: Option<ProgressFn>,
}

impl SkillContext {
    pub fn new(ai_config: AiConfig) -> Self {
        Self {
            input: Map::new(),
            environment: Environment::default(),
            ai_config,
            state: ExecutionState::default(),
            log: None,
            progress: None,
        }
    }

    pub fn with_input(mut self, input: Map<String, Value>) -> Self {
        self.input = input;
        self
    }

    /// Set a single input value.
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.input.insert(key.to_string(), value.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_log(mut self, sink: LogSink) -> Self {
        self.log = Some(sink);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        emit_log(self.log.as_ref(), level, message);
    }

    pub fn report_progress(&self, current: usize, total: usize, message: &str) {
        if let Some(ref progress) = self.progress {
            progress(current, total, message);
        }
    }

    /// A child context for a sub-skill call: same environment, backend and
    /// callbacks, new input, fresh state.
    pub fn fork(&self, input: Map<String, Value>) -> Self {
        Self {
            input,
            environment: self.environment.clone(),
            ai_config: self.ai_config.clone(),
            state: ExecutionState::default(),
            log: self.log.clone(),
            progress: self.progress.clone(),
        }
    }

    /// The bundle handed to tool handlers.
    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            ai_config: self.ai_config.clone(),
            environment: self.environment.clone(),
            log: self.log.clone(),
        }
    }
}

impl std::fmt::Debug for SkillContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillContext")
            .field("input", &self.input)
            .field("environment", &self.environment)
            .field("ai_config", &self.ai_config)
            .field("state", &self.state)
            .field("log", &self.log.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetails {
    pub steps_executed: usize,
    /// Wall-clock milliseconds.
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

/// Outcome of one `execute` call.
///
/// A failed result never carries an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ExecutionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_results: Option<StepResults>,
}

impl SkillResult {
    pub fn ok(output: Value, details: ExecutionDetails) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            details: Some(details),
            intermediate_results: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            details: None,
            intermediate_results: None,
        }
    }

    pub fn with_details(mut self, details: ExecutionDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_intermediate(mut self, results: StepResults) -> Self {
        self.intermediate_results = Some(results);
        self
    }

    pub fn tokens_used(&self) -> u64 {
        self.details
            .as_ref()
            .and_then(|d| d.tokens_used)
            .unwrap_or(0)
    }
}
