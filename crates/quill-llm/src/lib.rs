//! # quill-llm
//!
//! Abstraction layer over text-generation backends. Skills only ever see the
//! [`TextGenerator`] contract: a prompt plus optional generation parameters
//! in, generated text out.

pub mod provider;
pub mod router;
pub mod anthropic;
pub mod mock;

pub use provider::{GenerateOptions, Generation, TextGenerator, Usage};
pub use router::GeneratorRouter;
pub use anthropic::AnthropicGenerator;
pub use mock::MockGenerator;
