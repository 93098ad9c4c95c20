//! LLM providers used by the plan translator.
//!
//! Only chat completion is needed: the translator sends a system message and
//! one user prompt and reads back the text of the first choice.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatibleProvider;

use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// The role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat completion request. Unset sampling fields use the provider's
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Create a provider from configuration.
///
/// `dashscope`, `qwen`, and `openai` all speak the OpenAI chat completions
/// format; `mock` is a canned provider for offline runs.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.to_lowercase().as_str() {
        "dashscope" | "qwen" | "openai" | "openai_compatible" => {
            Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
        }
        "mock" => Ok(Arc::new(MockLlmProvider::new())),
        other => Err(LlmError::ApiRequest {
            message: format!("Unsupported LLM provider '{other}'"),
        }),
    }
}

/// A mock LLM provider for testing.
pub struct MockLlmProvider {
    model: String,
    responses: Mutex<Vec<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    failing: bool,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    ///
    /// Queues multiple copies of the response so it can handle multiple calls.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..20 {
            provider.queue_response(text);
        }
        provider
    }

    /// A provider whose every call fails with an API error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, text: &str) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        if self.failing {
            return Err(LlmError::ApiRequest {
                message: "mock provider failure".to_string(),
            });
        }
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        let text = if responses.is_empty() {
            r#"{"intent": "count_by_field", "entity": "papers", "groupby": "year"}"#.to_string()
        } else {
            responses.remove(0)
        };
        Ok(CompletionResponse {
            text,
            model: self.model.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_queued_then_default() {
        let mock = MockLlmProvider::new();
        mock.queue_response("first");
        let first = mock.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(first.text, "first");
        let second = mock.complete(CompletionRequest::default()).await.unwrap();
        assert!(second.text.contains("count_by_field"));
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockLlmProvider::failing();
        let err = mock.complete(CompletionRequest::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }

    #[test]
    fn test_create_provider_mock() {
        let config = LlmConfig {
            provider: "mock".to_string(),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "mock-model");
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_chat_message_serializes_lowercase_role() {
        let json = serde_json::to_value(ChatMessage::system("hi")).unwrap();
        assert_eq!(json["role"], "system");
    }
}
