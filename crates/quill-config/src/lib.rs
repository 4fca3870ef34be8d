//! # quill-config
//!
//! Configuration for the Quill skill engine. Reads `quill.toml`, then applies
//! environment variable overrides, then validates.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{AiSection, ConfigWarning, LoggingConfig, QuillConfig, SkillsSection, WarningSeverity};
