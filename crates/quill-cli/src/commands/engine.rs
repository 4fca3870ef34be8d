use std::sync::Arc;
use tracing::{debug, warn};

use quill_config::QuillConfig;
use quill_llm::{AnthropicGenerator, GeneratorRouter};
use quill_skills::{Backends, SkillManager, SkillStore};
use quill_tools::PluginHost;

/// Generators available under the current config. Anthropic is registered
/// only when an API key is configured; prompt skills fail with `service not
/// available` otherwise.
pub(super) fn generators(config: &QuillConfig) -> GeneratorRouter {
    let mut router = GeneratorRouter::new();
    match &config.ai.api_key {
        Some(key) => {
            let mut anthropic = AnthropicGenerator::new(key.clone())
                .with_defaults(config.ai.max_tokens, config.ai.temperature);
            if let Some(ref url) = config.ai.base_url {
                anthropic = anthropic.with_base_url(url.clone());
            }
            if let Some(ref model) = config.ai.model {
                anthropic = anthropic.with_model(model.clone());
            }
            router.add_generator(Arc::new(anthropic));
        }
        None => debug!("no API key configured, text generation disabled"),
    }
    router.set_default(config.ai.provider.clone());
    router
}

/// Open the skill registry from the configured store, registering the
/// builtin library when enabled.
pub(super) fn open_manager(config: &QuillConfig) -> quill_core::Result<SkillManager> {
    let backends = Backends::new(generators(config), Arc::new(PluginHost::with_builtins()));
    let store = SkillStore::new(config.skills.resolved_store_path());
    let mut manager = SkillManager::with_store(backends, store)?;

    if config.skills.load_builtin {
        let added = manager.register_builtin_skills()?;
        if !added.is_empty() {
            debug!(count = added.len(), "builtin skills added to store");
        }
    } else if manager.is_empty() {
        warn!("no skills registered and builtin loading is off");
    }
    Ok(manager)
}
