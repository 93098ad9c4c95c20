//! OpenAI-compatible LLM provider.
//!
//! Works with DashScope's compatible mode (Qwen models), OpenAI, and any
//! endpoint that follows the chat completions API format.

use super::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible LLM provider.
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider from configuration.
    ///
    /// Reads the API key from `config.api_key` or the environment variable
    /// named by `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!("{}: env var '{}' not set", config.provider, config.api_key_env),
            })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new provider with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": request.messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "stream": false,
        })
    }

    /// Parse an OpenAI-format response body.
    fn parse_response(body: &Value, model: &str) -> Result<CompletionResponse, LlmError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No choices in response".to_string(),
            })?;

        let text = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }

        Ok(CompletionResponse {
            text: text.to_string(),
            model: body
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(model)
                .to_string(),
            finish_reason: choice
                .get("finish_reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed");
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim().trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            code if code >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(url = %url, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Self::parse_response(&json, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatMessage;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key_env: "CITEVIZ_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_new_without_key_fails() {
        let err = OpenAiCompatibleProvider::new(&test_config()).err().unwrap();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[test]
    fn test_new_with_key_trims_base_url() {
        let config = LlmConfig {
            base_url: Some("http://localhost:8000/v1/".to_string()),
            ..test_config()
        };
        let provider = OpenAiCompatibleProvider::new_with_key(&config, "sk-test".into()).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
        assert_eq!(provider.model_name(), "qwen-plus");
    }

    #[test]
    fn test_request_body_uses_config_defaults() {
        let provider =
            OpenAiCompatibleProvider::new_with_key(&test_config(), "sk-test".into()).unwrap();
        let request = CompletionRequest {
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
            ..Default::default()
        };
        let body = provider.request_body(&request);
        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "model": "qwen-plus-2025",
            "choices": [{
                "message": {"role": "assistant", "content": "  {\"intent\": \"distribution\"}  "},
                "finish_reason": "stop"
            }]
        });
        let response = OpenAiCompatibleProvider::parse_response(&body, "qwen-plus").unwrap();
        assert_eq!(response.text, "{\"intent\": \"distribution\"}");
        assert_eq!(response.model, "qwen-plus-2025");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_response_errors() {
        let no_choices = json!({"choices": []});
        assert!(matches!(
            OpenAiCompatibleProvider::parse_response(&no_choices, "m"),
            Err(LlmError::ResponseParse { .. })
        ));
        let empty = json!({"choices": [{"message": {"content": ""}}]});
        assert!(matches!(
            OpenAiCompatibleProvider::parse_response(&empty, "m"),
            Err(LlmError::EmptyCompletion)
        ));
    }

    #[test]
    fn test_map_http_error() {
        use reqwest::StatusCode;
        assert!(matches!(
            OpenAiCompatibleProvider::map_http_error(StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthFailed { .. }
        ));
        let body = r#"{"error": {"message": "Rate limit reached, try again in 12s"}}"#;
        assert!(matches!(
            OpenAiCompatibleProvider::map_http_error(StatusCode::TOO_MANY_REQUESTS, body),
            LlmError::RateLimited {
                retry_after_secs: 12
            }
        ));
        assert!(matches!(
            OpenAiCompatibleProvider::map_http_error(StatusCode::BAD_GATEWAY, "upstream"),
            LlmError::ApiRequest { .. }
        ));
    }
}
