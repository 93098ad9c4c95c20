//! Plan translation through a language model.

use super::PlanTranslator;
use super::keyword::{infer_entity, infer_intent};
use super::prompts::{SYSTEM_MESSAGE, query_parser_prompt};
use crate::error::TranslateError;
use crate::plan::QueryPlan;
use crate::providers::{ChatMessage, CompletionRequest, LlmProvider};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Asks an [`LlmProvider`] for a JSON plan and repairs what it can.
pub struct LlmPlanTranslator<P: LlmProvider + ?Sized> {
    provider: Arc<P>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl<P: LlmProvider + ?Sized> LlmPlanTranslator<P> {
    /// Use the provider's configured sampling settings.
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl<P: LlmProvider + ?Sized + 'static> PlanTranslator for LlmPlanTranslator<P> {
    async fn translate(&self, question: &str) -> Result<QueryPlan, TranslateError> {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_MESSAGE),
                ChatMessage::user(query_parser_prompt(question)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            model: None,
        };
        let response = self.provider.complete(request).await?;
        debug!(reply = %response.text, "Plan reply received");

        let plan = parse_plan_reply(&response.text, question)?;
        info!(intent = %plan.intent, entity = %plan.entity, "Query parsed");
        Ok(plan)
    }

    fn kind(&self) -> String {
        format!("llm:{}", self.provider.model_name())
    }
}

/// Strip a surrounding Markdown code fence (with or without a `json` tag).
pub fn strip_code_fences(reply: &str) -> &str {
    let reply = reply.trim();
    let inner = if let Some(rest) = reply.strip_prefix("```json") {
        rest
    } else if let Some(rest) = reply.strip_prefix("```") {
        rest
    } else {
        return reply;
    };
    inner.split("```").next().unwrap_or(inner).trim()
}

/// Turn a model reply into a plan.
///
/// A missing or non-string `intent`/`entity` is inferred from the question's
/// keywords. `measure`, `filters`, and `sort` default to `count`, `{}`, and
/// `desc`, and the question is echoed as `original_query`.
pub fn parse_plan_reply(reply: &str, question: &str) -> Result<QueryPlan, TranslateError> {
    let body = strip_code_fences(reply);
    let value: Value = serde_json::from_str(body).map_err(|e| TranslateError::InvalidJson {
        message: e.to_string(),
    })?;
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(TranslateError::NotAnObject {
                found: json_type(&other).to_string(),
            });
        }
    };

    if !map.get("intent").is_some_and(Value::is_string) {
        map.insert("intent".into(), infer_intent(question).as_str().into());
    }
    if !map.get("entity").is_some_and(Value::is_string) {
        map.insert("entity".into(), infer_entity(question).as_str().into());
    }
    set_default(&mut map, "measure", Value::from("count"));
    set_default(&mut map, "filters", Value::Object(Map::new()));
    set_default(&mut map, "sort", Value::from("desc"));
    set_default(&mut map, "original_query", Value::from(question));

    serde_json::from_value(Value::Object(map)).map_err(|e| TranslateError::InvalidJson {
        message: e.to_string(),
    })
}

fn set_default(map: &mut Map<String, Value>, key: &str, value: Value) {
    map.entry(key).or_insert(value);
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
