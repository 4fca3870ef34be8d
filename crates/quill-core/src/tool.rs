use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{AiConfig, Environment, LogLevel, LogSink, emit_log};

/// Description of a tool exposed by a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Unique name, e.g. "word_count".
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema of the parameters object.
    pub input_schema: Value,
    /// Which plugin provides this tool.
    pub plugin: String,
}

/// The context bundle passed along with every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub ai_config: AiConfig,
    pub environment: Environment,
    pub log: Option<LogSink>,
}

impl ToolContext {
    pub fn new(ai_config: AiConfig, environment: Environment) -> Self {
        Self {
            ai_config,
            environment,
            log: None,
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        emit_log(self.log.as_ref(), level, message);
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("ai_config", &self.ai_config)
            .field("environment", &self.environment)
            .field("log", &self.log.is_some())
            .finish()
    }
}

/// Anything that can resolve a tool by name and run it.
///
/// Implementations fail with [`crate::QuillError::ToolNotFound`] for unknown
/// names and [`crate::QuillError::PluginNotEnabled`] when the owning plugin is
/// switched off.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// List all tools this registry currently exposes.
    fn tools(&self) -> Vec<ToolInfo>;

    /// Invoke a tool with already-resolved parameters.
    async fn invoke(
        &self,
        tool: &str,
        params: Map<String, Value>,
        context: &ToolContext,
    ) -> crate::Result<Value>;
}
