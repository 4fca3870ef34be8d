use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::manifest::PluginManifest;
use quill_core::{QuillError, Result, ToolContext, ToolInfo, ToolRegistry};

/// The executable half of a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, params: Map<String, Value>, context: &ToolContext) -> Result<Value>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>, &ToolContext) -> Result<Value> + Send + Sync,
{
    async fn call(&self, params: Map<String, Value>, context: &ToolContext) -> Result<Value> {
        (self.0)(params, context)
    }
}

/// Wrap a synchronous closure as a [`ToolHandler`].
pub fn handler_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Map<String, Value>, &ToolContext) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// A single tool exposed by a plugin.
#[derive(Clone)]
pub struct PluginTool {
    pub name: String,
    pub description: String,
    /// JSON Schema of the parameters object.
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl PluginTool {
    pub fn new(name: &str, description: &str, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            handler,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A named group of tools sharing one enable switch.
#[derive(Clone)]
pub struct ToolPlugin {
    pub manifest: PluginManifest,
    pub enabled: bool,
    pub tools: Vec<PluginTool>,
}

impl ToolPlugin {
    pub fn new(manifest: PluginManifest) -> Self {
        Self {
            manifest,
            enabled: true,
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: PluginTool) -> Self {
        self.tools.push(tool);
        self
    }

    fn info(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
                plugin: self.manifest.id.clone(),
            })
            .collect()
    }
}

/// The plugin host: owns registered plugins and dispatches tool calls.
///
/// Interior locking lets one host be shared as `Arc<dyn ToolRegistry>` while
/// plugins are still enabled or disabled from the control thread. The lock is
/// never held across a handler's await point.
#[derive(Default)]
pub struct PluginHost {
    plugins: RwLock<HashMap<String, ToolPlugin>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host preloaded with the builtin plugins.
    pub fn with_builtins() -> Self {
        let host = Self::new();
        for plugin in crate::builtin::builtin_plugins() {
            let id = plugin.manifest.id.clone();
            if let Err(e) = host.register(plugin) {
                warn!(plugin = %id, error = %e, "failed to register builtin plugin");
            }
        }
        host
    }

    /// Register a plugin. Fails if the id or one of its tool names is taken.
    pub fn register(&self, plugin: ToolPlugin) -> Result<()> {
        let mut plugins = self.plugins.write();
        let id = plugin.manifest.id.clone();
        if plugins.contains_key(&id) {
            return Err(QuillError::Conflict(format!("plugin already registered: {id}")));
        }
        for tool in &plugin.tools {
            if let Some(owner) = plugins
                .values()
                .find(|p| p.tools.iter().any(|t| t.name == tool.name))
            {
                return Err(QuillError::Conflict(format!(
                    "tool {} already provided by plugin {}",
                    tool.name, owner.manifest.id
                )));
            }
        }
        info!(plugin = %id, tools = plugin.tools.len(), "registered tool plugin");
        plugins.insert(id, plugin);
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> Result<()> {
        self.plugins
            .write()
            .remove(id)
            .map(|_| info!(plugin = id, "unregistered tool plugin"))
            .ok_or_else(|| QuillError::NotFound(format!("plugin {id}")))
    }

    pub fn enable(&self, id: &str) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable(&self, id: &str) -> Result<()> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut plugins = self.plugins.write();
        let plugin = plugins
            .get_mut(id)
            .ok_or_else(|| QuillError::NotFound(format!("plugin {id}")))?;
        plugin.enabled = enabled;
        debug!(plugin = id, enabled, "plugin toggled");
        Ok(())
    }

    /// Manifests of all registered plugins with their enable flag, sorted by id.
    pub fn plugins(&self) -> Vec<(PluginManifest, bool)> {
        let mut list: Vec<_> = self
            .plugins
            .read()
            .values()
            .map(|p| (p.manifest.clone(), p.enabled))
            .collect();
        list.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        list
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.plugins.read().get(id).is_some_and(|p| p.enabled)
    }

    /// Case-insensitive substring search over tool names and descriptions.
    pub fn search_tools(&self, query: &str) -> Vec<ToolInfo> {
        let query = query.to_lowercase();
        self.tools()
            .into_iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&query)
                    || t.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Find the handler for `tool`, checking that its plugin is enabled.
    fn lookup(&self, tool: &str) -> Result<(String, Arc<dyn ToolHandler>)> {
        let plugins = self.plugins.read();
        let (plugin, handler) = plugins
            .values()
            .find_map(|p| {
                p.tools
                    .iter()
                    .find(|t| t.name == tool)
                    .map(|t| (p, Arc::clone(&t.handler)))
            })
            .ok_or_else(|| QuillError::ToolNotFound(tool.to_string()))?;

        if !plugin.enabled {
            return Err(QuillError::PluginNotEnabled(plugin.manifest.id.clone()));
        }
        Ok((plugin.manifest.id.clone(), handler))
    }
}

#[async_trait]
impl ToolRegistry for PluginHost {
    fn tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<_> = self.plugins.read().values().flat_map(|p| p.info()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    async fn invoke(
        &self,
        tool: &str,
        params: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<Value> {
        let (plugin, handler) = self.lookup(tool)?;
        debug!(tool, plugin = %plugin, "invoking tool");

        handler.call(params, context).await.map_err(|e| {
            warn!(tool, plugin = %plugin, error = %e, "tool execution failed");
            match e {
                QuillError::ToolExecution { .. } => e,
                other => QuillError::ToolExecution {
                    tool: tool.to_string(),
                    reason: other.to_string(),
                },
            }
        })
    }
}
