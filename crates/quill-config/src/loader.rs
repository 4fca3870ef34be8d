use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::QuillConfig;
use quill_core::QuillError;

/// Loads and reloads the Quill configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<QuillConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > QUILL_CONFIG env > ~/.quill/quill.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("QUILL_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quill")
            .join("quill.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> quill_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::read(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            QuillConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => return Err(QuillError::Config(e)),
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> QuillConfig {
        self.config.read().clone()
    }

    /// Get a shared handle for long-lived readers.
    pub fn shared(&self) -> Arc<RwLock<QuillConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was (or would be) loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn read(path: &Path) -> quill_core::Result<QuillConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<QuillConfig>(&raw).map_err(|e| {
            QuillError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply env var overrides (QUILL_AI_PROVIDER, QUILL_LOG_LEVEL, etc.)
    fn apply_env_overrides(mut config: QuillConfig) -> QuillConfig {
        if let Ok(v) = std::env::var("QUILL_AI_PROVIDER") {
            config.ai.provider = v;
        }
        if let Ok(v) = std::env::var("QUILL_AI_MODEL") {
            config.ai.model = Some(v);
        }
        if let Ok(v) = std::env::var("QUILL_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("QUILL_SKILLS_PATH") {
            config.skills.store_path = Some(PathBuf::from(v));
        }
        // Config file takes priority for the key, env is the fallback.
        if config.ai.api_key.is_none() {
            if let Ok(v) = std::env::var("ANTHROPIC_API_KEY") {
                config.ai.api_key = Some(v);
            }
        }
        config
    }

    /// Reload the config from disk. On failure the current config is kept.
    pub fn reload(&self) -> quill_core::Result<()> {
        if !self.config_path.exists() {
            return Err(QuillError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::read(&self.config_path)?);
        new_config.validate().map_err(QuillError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
