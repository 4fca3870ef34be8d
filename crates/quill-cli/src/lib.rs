//! # quill-cli
//!
//! Command-line interface for the Quill skill engine.
//!
//! ## Commands
//!
//! - `quill skill list|show|search|run|enable|disable|remove|import|export|builtin`
//! - `quill tool list`: tools available to tool skills and workflow steps
//! - `quill config`: show the effective configuration
//! - `quill version`, `quill completions <shell>`

pub mod commands;

pub use commands::Cli;
