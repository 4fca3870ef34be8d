use std::sync::Arc;
use tracing::{debug, info};

use crate::provider::TextGenerator;
use quill_core::{QuillError, Result};

/// Routes generation requests to the backend named by a skill's `aiConfig`.
#[derive(Clone, Default)]
pub struct GeneratorRouter {
    generators: Vec<Arc<dyn TextGenerator>>,
    /// Provider used when a request names none.
    default_provider: Option<String>,
}

impl GeneratorRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. The first one registered becomes the default.
    pub fn add_generator(&mut self, generator: Arc<dyn TextGenerator>) {
        let name = generator.name().to_string();
        info!(provider = %name, "registered text generator");
        if self.default_provider.is_none() {
            self.default_provider = Some(name);
        }
        self.generators.push(generator);
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.add_generator(generator);
        self
    }

    /// Override which provider answers requests that name none.
    pub fn set_default(&mut self, provider: impl Into<String>) {
        self.default_provider = Some(provider.into());
    }

    /// Names of every registered backend, in registration order.
    pub fn providers(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Look up a backend by provider id (case-insensitive).
    pub fn get(&self, provider: &str) -> Option<Arc<dyn TextGenerator>> {
        self.generators
            .iter()
            .find(|g| g.name().eq_ignore_ascii_case(provider))
            .cloned()
    }

    /// Resolve the backend for a request, falling back to the default when
    /// `provider` is empty.
    pub fn resolve(&self, provider: &str) -> Result<Arc<dyn TextGenerator>> {
        let wanted = if provider.is_empty() {
            self.default_provider.as_deref().unwrap_or_default()
        } else {
            provider
        };
        debug!(provider = wanted, "resolving text generator");
        self.get(wanted).ok_or_else(|| {
            QuillError::ServiceUnavailable(if wanted.is_empty() {
                "no text generator configured".to_string()
            } else {
                wanted.to_string()
            })
        })
    }
}
