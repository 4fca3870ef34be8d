use thiserror::Error;

/// Unified error type for the Quill workspace.
#[derive(Error, Debug)]
pub enum QuillError {
    // ── Registry errors ────────────────────────────────────────
    #[error("invalid skill: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("skill not found: {0}")]
    NotFound(String),

    #[error("skill already registered: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("skill is not enabled: {0}")]
    NotEnabled(String),

    // ── Execution errors ───────────────────────────────────────
    #[error("dependency not met: {0}")]
    DependencyNotMet(String),

    #[error("unsupported step type: {0}")]
    UnsupportedStep(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("sub-skill {skill} failed: {reason}")]
    SubSkillFailed { skill: String, reason: String },

    #[error("skill nesting too deep: {depth} levels")]
    RecursionLimit { depth: usize },

    // ── Backend errors ─────────────────────────────────────────
    #[error("service not available: {0}")]
    ServiceUnavailable(String),

    #[error("generation failed: {0}")]
    Generation(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("plugin not enabled: {0}")]
    PluginNotEnabled(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    // ── Config / storage errors ────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QuillError>;
