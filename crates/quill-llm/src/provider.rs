use async_trait::async_trait;
use quill_core::Result;
use serde::{Deserialize, Serialize};

/// Optional generation parameters forwarded with a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    /// System instruction (sent separately for backends that support it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Model override; the backend's default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum output size in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    /// Input plus output, saturating at `u32::MAX`.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Generated text plus whatever usage the backend reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<Usage>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Trait implemented by each text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider id used for lookup, e.g. "anthropic".
    fn name(&self) -> &str;

    /// Generate text for a single prompt.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation>;
}
