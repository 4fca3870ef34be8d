use async_trait::async_trait;
use quill_core::{QuillError, Result};
use reqwest::Client;
use tracing::debug;

use crate::provider::*;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Anthropic Messages API backend.
pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicGenerator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Defaults applied when a request leaves max tokens / temperature unset.
    pub fn with_defaults(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    fn build_request_body(&self, prompt: &str, options: &GenerateOptions) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": options.model.as_deref().unwrap_or(&self.model),
            "max_tokens": options.max_tokens.unwrap_or(self.max_tokens),
            "temperature": options.temperature.unwrap_or(self.temperature),
            "messages": [{ "role": "user", "content": prompt }],
        });

        if let Some(ref system) = options.system_prompt {
            body["system"] = serde_json::json!(system);
        }

        body
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        let body = self.build_request_body(prompt, options);
        debug!(model = %body["model"], "sending Anthropic API request");

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| QuillError::Generation(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuillError::Generation(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| QuillError::Generation(e.to_string()))?;

        Ok(parse_response(&data))
    }
}

/// Concatenate the text blocks of a Messages API response.
fn parse_response(data: &serde_json::Value) -> Generation {
    let text = data["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let usage = data.get("usage").map(|u| Usage {
        input_tokens: token_count(&u["input_tokens"]),
        output_tokens: token_count(&u["output_tokens"]),
    });

    Generation { text, usage }
}

/// Counts past `u32::MAX` clamp rather than wrap.
fn token_count(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_defaults_when_options_unset() {
        let generator = AnthropicGenerator::new("key".into());
        let body = generator.build_request_body("hi", &GenerateOptions::default());
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn body_applies_overrides() {
        let generator = AnthropicGenerator::new("key".into()).with_model("claude-haiku".into());
        let options = GenerateOptions {
            system_prompt: Some("You are an editor.".into()),
            model: None,
            temperature: Some(0.25),
            max_tokens: Some(300),
        };
        let body = generator.build_request_body("polish", &options);
        assert_eq!(body["model"], "claude-haiku");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["temperature"], 0.25);
        assert_eq!(body["system"], "You are an editor.");
    }

    #[test]
    fn parse_joins_text_blocks_and_usage() {
        let data = serde_json::json!({
            "content": [
                { "type": "text", "text": "Hello " },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "world" }
            ],
            "usage": { "input_tokens": 12, "output_tokens": 3 }
        });
        let generation = parse_response(&data);
        assert_eq!(generation.text, "Hello world");
        assert_eq!(generation.usage.unwrap().total_tokens(), 15);
    }

    #[test]
    fn parse_clamps_oversized_usage() {
        let data = serde_json::json!({
            "content": [],
            "usage": { "input_tokens": 5_000_000_000u64, "output_tokens": 7 }
        });
        let usage = parse_response(&data).usage.unwrap();
        assert_eq!(usage.input_tokens, u32::MAX);
        assert_eq!(usage.output_tokens, 7);
        assert_eq!(usage.total_tokens(), u32::MAX);
    }
}
