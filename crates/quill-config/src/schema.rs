use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, maps to `quill.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    pub ai: AiSection,
    pub skills: SkillsSection,
    pub logging: LoggingConfig,
}

// ── AI ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSection {
    /// Provider name skills fall back to when they don't pick one.
    pub provider: String,
    /// Model identifier passed to the provider. `None` = provider default.
    pub model: Option<String>,
    /// Maximum tokens per generation when a skill sets no limit.
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0) when a skill sets none.
    pub temperature: f32,
    /// API key. Falls back to `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,
    /// Override for the provider's API endpoint.
    pub base_url: Option<String>,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            model: None,
            max_tokens: 1000,
            temperature: 0.7,
            api_key: None,
            base_url: None,
        }
    }
}

// ── Skills ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsSection {
    /// Skill store document. `None` = `~/.quill/skills.json`.
    pub store_path: Option<PathBuf>,
    /// Register the builtin skill library on start-up.
    pub load_builtin: bool,
}

impl Default for SkillsSection {
    fn default() -> Self {
        Self {
            store_path: None,
            load_builtin: true,
        }
    }
}

impl SkillsSection {
    /// The configured store path, or the default under the home directory.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".quill")
                .join("skills.json")
        })
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl QuillConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Provider ───
        if self.ai.provider.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "ai.provider".into(),
                message: "provider is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'anthropic'".into()),
            });
        } else if self.ai.provider == "anthropic" && self.ai.api_key.is_none() {
            warnings.push(ConfigWarning {
                field: "ai.api_key".into(),
                message: "no API key, prompt skills will fail".into(),
                severity: WarningSeverity::Info,
                hint: Some("Set ai.api_key or export ANTHROPIC_API_KEY".into()),
            });
        }

        // ── Temperature ───
        if !(0.0..=1.0).contains(&self.ai.temperature) {
            warnings.push(ConfigWarning {
                field: "ai.temperature".into(),
                message: format!("temperature {} is out of range", self.ai.temperature),
                severity: WarningSeverity::Error,
                hint: Some("Temperature must be between 0.0 and 1.0".into()),
            });
        }

        // ── Max tokens ───
        if self.ai.max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "ai.max_tokens".into(),
                message: "max_tokens is 0, generations would be empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 1000".into()),
            });
        }

        // ── Base URL ───
        if let Some(url) = &self.ai.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(ConfigWarning {
                    field: "ai.base_url".into(),
                    message: format!("base_url '{url}' is not an http(s) URL"),
                    severity: WarningSeverity::Warning,
                    hint: None,
                });
            }
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
