//! # quill-tools
//!
//! The tool-plugin registry skills call into. A plugin groups related tools
//! under one id and one enable switch; each tool is a named async handler
//! taking a JSON parameter object.
//!
//! ```text
//! PluginHost ──► ToolPlugin (enabled?) ──► PluginTool ──► ToolHandler
//! ```
//!
//! Lookups fail with `tool not found` for unknown names and `plugin not
//! enabled` when the owning plugin is switched off.

pub mod builtin;
pub mod host;
pub mod manifest;

pub use host::{PluginHost, PluginTool, ToolHandler, ToolPlugin, handler_fn};
pub use manifest::PluginManifest;
