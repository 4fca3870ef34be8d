//! Plugins that ship with the host.

use serde_json::{Map, Value, json};

use crate::host::{PluginTool, ToolPlugin, handler_fn};
use crate::manifest::PluginManifest;
use quill_core::QuillError;

pub const TEXT_PLUGIN_ID: &str = "builtin-text";
pub const SYSTEM_PLUGIN_ID: &str = "builtin-system";

pub fn builtin_plugins() -> Vec<ToolPlugin> {
    vec![text_plugin(), system_plugin()]
}

fn text_param(params: &Map<String, Value>) -> quill_core::Result<&str> {
    params
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| QuillError::MissingParameter("text".into()))
}

fn text_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "text": { "type": "string", "description": "Text to inspect" } },
        "required": ["text"]
    })
}

/// Word, character, line and paragraph counts.
pub fn text_stats(text: &str) -> Value {
    let paragraphs = text
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();
    json!({
        "words": text.split_whitespace().count(),
        "characters": text.chars().count(),
        "lines": if text.is_empty() { 0 } else { text.lines().count() },
        "paragraphs": paragraphs,
    })
}

fn text_plugin() -> ToolPlugin {
    ToolPlugin::new(PluginManifest::new(
        TEXT_PLUGIN_ID,
        "Text",
        "Plain-text inspection utilities",
    ))
    .with_tool(
        PluginTool::new(
            "word_count",
            "Count the words in a text",
            handler_fn(|params, _| {
                let text = text_param(&params)?;
                Ok(Value::from(text.split_whitespace().count()))
            }),
        )
        .with_schema(text_schema()),
    )
    .with_tool(
        PluginTool::new(
            "text_stats",
            "Word, character, line and paragraph statistics",
            handler_fn(|params, _| Ok(text_stats(text_param(&params)?))),
        )
        .with_schema(text_schema()),
    )
}

fn system_plugin() -> ToolPlugin {
    ToolPlugin::new(PluginManifest::new(
        SYSTEM_PLUGIN_ID,
        "System",
        "System information and utilities",
    ))
    .with_tool(PluginTool::new(
        "get_system_info",
        "Get system information",
        handler_fn(|_, ctx| {
            let mut info = json!({
                "platform": std::env::consts::OS,
                "arch": std::env::consts::ARCH,
                "family": std::env::consts::FAMILY,
                "cpus": std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            });
            if let Some(ref workspace) = ctx.environment.workspace_path {
                info["workspace"] = Value::from(workspace.as_str());
            }
            Ok(info)
        }),
    ))
}
