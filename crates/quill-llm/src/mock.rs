//! Mock text generator for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::provider::*;
use quill_core::{QuillError, Result};

/// A recorded call to the mock generator.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    pub prompt: String,
    pub options: GenerateOptions,
}

/// A pre-configured response from the mock generator.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub text: String,
    pub usage: Usage,
    /// If set, the generator will return this error instead.
    pub error: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: String::new(),
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            error: None,
        }
    }
}

impl MockResponse {
    /// Create a text response.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Create an error response.
    pub fn error(msg: &str) -> Self {
        Self {
            error: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

/// A mock generator that returns queued responses in order.
///
/// # Example
/// ```
/// use quill_llm::mock::MockGenerator;
/// let generator = MockGenerator::new("mock").with_response("Hello, world!");
/// ```
pub struct MockGenerator {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Track all requests received (for assertions in tests).
    requests: Arc<Mutex<Vec<MockRequest>>>,
    /// When set, every prompt is answered with itself instead of a queued response.
    echo: bool,
    name: String,
}

impl MockGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(vec![])),
            echo: false,
            name: name.into(),
        }
    }

    /// A generator that answers every prompt with the prompt text.
    pub fn echo(name: impl Into<String>) -> Self {
        Self {
            echo: true,
            ..Self::new(name)
        }
    }

    /// Queue a simple text response.
    pub fn with_response(self, text: &str) -> Self {
        self.responses.lock().push_back(MockResponse::text(text));
        self
    }

    /// Queue an error response.
    pub fn with_error(self, error: &str) -> Self {
        self.responses.lock().push_back(MockResponse::error(error));
        self
    }

    /// Queue a fully custom response.
    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().push_back(resp);
        self
    }

    /// Shared handle to every request made so far.
    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<MockRequest>>> {
        Arc::clone(&self.requests)
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Pop the next queued response, or return a default "no response queued" message.
    fn next_response(&self, prompt: &str) -> MockResponse {
        if self.echo {
            return MockResponse::text(prompt);
        }
        self.responses.lock().pop_front().unwrap_or_else(|| MockResponse {
            text: "(mock: no more queued responses)".to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        self.requests.lock().push(MockRequest {
            prompt: prompt.to_string(),
            options: options.clone(),
        });
        let mock = self.next_response(prompt);

        if let Some(error) = mock.error {
            return Err(QuillError::Generation(error));
        }

        Ok(Generation {
            text: mock.text,
            usage: Some(mock.usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_text_response() {
        let generator = MockGenerator::new("mock").with_response("Hello!");
        let resp = generator
            .generate("hi", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.usage.unwrap().total_tokens(), 150);
    }

    #[tokio::test]
    async fn test_mock_error() {
        let generator = MockGenerator::new("mock").with_error("HTTP 500: boom");
        let result = generator.generate("hi", &GenerateOptions::default()).await;
        assert!(matches!(result, Err(QuillError::Generation(_))));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let generator = MockGenerator::new("mock").with_response("ok");
        let options = GenerateOptions {
            system_prompt: Some("be nice".into()),
            temperature: Some(0.3),
            ..Default::default()
        };
        generator.generate("hello", &options).await.unwrap();

        let recorded = generator.recorded_requests();
        let recorded = recorded.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].prompt, "hello");
        assert_eq!(recorded[0].options.system_prompt.as_deref(), Some("be nice"));
    }

    #[tokio::test]
    async fn test_mock_multiple_responses_in_order() {
        let generator = MockGenerator::new("mock")
            .with_response("first")
            .with_response("second");
        let opts = GenerateOptions::default();
        assert_eq!(generator.generate("a", &opts).await.unwrap().text, "first");
        assert_eq!(generator.generate("b", &opts).await.unwrap().text, "second");
        assert!(
            generator
                .generate("c", &opts)
                .await
                .unwrap()
                .text
                .contains("no more queued")
        );
    }

    #[tokio::test]
    async fn test_echo_returns_prompt() {
        let generator = MockGenerator::echo("echo");
        let resp = generator
            .generate("repeat me", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.text, "repeat me");
        assert_eq!(generator.call_count(), 1);
    }
}
