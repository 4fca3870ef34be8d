use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which text-generation backend a skill invocation should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// Backend provider id, e.g. "anthropic".
    pub provider: String,
    /// Optional model id; the backend picks its default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AiConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A cursor location inside the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub ch: u32,
}

/// Ambient editor state available to skills and tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<CursorPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Host-supplied callback that receives skill log lines.
pub type LogSink = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Emit a log line through `tracing` and, when present, the host sink.
pub fn emit_log(sink: Option<&LogSink>, level: LogLevel, message: &str) {
    match level {
        LogLevel::Info => tracing::info!(target: "quill::skill", "{message}"),
        LogLevel::Warn => tracing::warn!(target: "quill::skill", "{message}"),
        LogLevel::Error => tracing::error!(target: "quill::skill", "{message}"),
    }
    if let Some(sink) = sink {
        sink(level, message);
    }
}
