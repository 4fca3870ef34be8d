//! # quill-core
//!
//! Core types, traits, and primitives shared by every Quill crate: the
//! unified error type, the ambient execution environment handed to skills,
//! and the tool registry contract that skills call out to.

pub mod error;
pub mod tool;
pub mod types;

pub use error::{QuillError, Result};
pub use tool::{ToolContext, ToolInfo, ToolRegistry};
pub use types::*;
