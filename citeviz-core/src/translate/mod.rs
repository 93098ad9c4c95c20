//! Question to [`QueryPlan`] translation.
//!
//! The LLM translator is used when an API key is available; otherwise the
//! keyword translator answers every question with a heuristic plan.

pub mod keyword;
pub mod llm;
pub mod prompts;

pub use keyword::{KeywordTranslator, infer_entity, infer_intent};
pub use llm::{LlmPlanTranslator, parse_plan_reply, strip_code_fences};

use crate::config::LlmConfig;
use crate::error::TranslateError;
use crate::plan::QueryPlan;
use crate::providers::create_provider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Produces a query plan for a natural-language question.
#[async_trait]
pub trait PlanTranslator: Send + Sync {
    async fn translate(&self, question: &str) -> Result<QueryPlan, TranslateError>;

    /// Short label for health output, e.g. `keyword` or `llm:qwen-plus`.
    fn kind(&self) -> String;
}

/// Build the translator the configuration asks for, falling back to
/// keywords when the model provider cannot be set up.
pub fn from_config(config: &LlmConfig) -> Arc<dyn PlanTranslator> {
    if config.provider.eq_ignore_ascii_case("keyword") {
        return Arc::new(KeywordTranslator);
    }
    if !config.provider.eq_ignore_ascii_case("mock") && config.resolve_api_key().is_none() {
        warn!(
            env_var = %config.api_key_env,
            "No API key set; using keyword translation"
        );
        return Arc::new(KeywordTranslator);
    }
    match create_provider(config) {
        Ok(provider) => {
            info!(provider = %config.provider, model = %provider.model_name(), "LLM translator ready");
            Arc::new(
                LlmPlanTranslator::new(provider).with_sampling(config.temperature, config.max_tokens),
            )
        }
        Err(e) => {
            warn!(error = %e, "LLM provider unavailable; using keyword translation");
            Arc::new(KeywordTranslator)
        }
    }
}
