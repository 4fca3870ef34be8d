//! # quill-skills
//!
//! The skill execution engine. A skill is a named, reusable unit of AI work
//! with one of four definition variants:
//!
//! - **prompt**: fill a `{{placeholder}}` template from the caller's input and
//!   send it to a text generator.
//! - **workflow**: run an ordered list of steps (prompt, tool, transform),
//!   each able to read the outputs of the steps before it.
//! - **tool**: call one registered tool with parameters mapped from the
//!   input, then optionally reformat the result.
//! - **hybrid**: run other registered skills in order and merge their
//!   outputs.
//!
//! [`SkillManager`] owns the registry, persists it through a [`SkillStore`]
//! and dispatches execution. Every execution returns a [`SkillResult`];
//! errors never escape `execute`.

pub mod builtin;
pub mod context;
pub mod hybrid;
pub mod manager;
pub mod resolve;
pub mod skill;
pub mod step;
pub mod store;
pub mod template;
pub mod validate;
pub mod workflow;

pub use builtin::builtin_skills;
pub use context::{ExecutionDetails, ExecutionState, ProgressFn, SkillContext, SkillResult, StepResults};
pub use hybrid::merge_results;
pub use manager::{MAX_SKILL_DEPTH, SkillManager, process_result};
pub use resolve::resolve;
pub use skill::*;
pub use step::{Backends, StepOutput};
pub use store::SkillStore;
pub use template::fill;
pub use validate::validate;
