//! Keyword heuristics for questions the language model cannot handle, or
//! when no model is configured.

use super::PlanTranslator;
use crate::error::TranslateError;
use crate::plan::{Entity, Intent, QueryPlan};
use async_trait::async_trait;

/// Guess the intent from trigger words.
pub fn infer_intent(question: &str) -> Intent {
    let q = question.to_lowercase();
    if q.contains("top") || q.contains("most") {
        Intent::TopRanking
    } else if q.contains("trend") || q.contains("over time") {
        Intent::TrendAnalysis
    } else if q.contains("distribution") {
        Intent::Distribution
    } else {
        Intent::CountByField
    }
}

/// Authors when the question mentions them, papers otherwise.
pub fn infer_entity(question: &str) -> Entity {
    if question.to_lowercase().contains("author") {
        Entity::Authors
    } else {
        Entity::Papers
    }
}

fn infer_groupby(q: &str) -> &'static str {
    if q.contains("journal") {
        "journal"
    } else if q.contains("field") {
        "field"
    } else {
        "year"
    }
}

fn infer_aggregation_field(q: &str, entity: Entity) -> &'static str {
    if q.contains("patent") {
        "patent_count"
    } else if q.contains("collaborat") {
        "collaboration_count"
    } else if entity == Entity::Authors {
        "paper_count"
    } else {
        "citations_count"
    }
}

fn first_number(q: &str) -> Option<usize> {
    q.split(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse().ok())
}

/// Builds a plan from keywords alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordTranslator;

impl KeywordTranslator {
    pub fn new() -> Self {
        Self
    }

    /// The plan for one question. Never fails.
    pub fn plan_for(&self, question: &str) -> QueryPlan {
        let q = question.to_lowercase();
        let intent = infer_intent(&q);
        let entity = infer_entity(&q);
        let mut plan = QueryPlan::new(intent.clone(), entity);

        match intent {
            Intent::TopRanking => {
                plan.aggregation_field = Some(infer_aggregation_field(&q, entity).to_string());
                plan.limit = first_number(&q);
            }
            Intent::Distribution => {
                plan.aggregation_field = Some(infer_aggregation_field(&q, entity).to_string());
            }
            Intent::TrendAnalysis => {
                plan.groupby = Some("year".to_string());
            }
            Intent::CountByField | Intent::Comparison | Intent::Other(_) => {
                plan.groupby = Some(infer_groupby(&q).to_string());
            }
        }
        plan.original_query = Some(question.to_string());
        plan
    }
}

#[async_trait]
impl PlanTranslator for KeywordTranslator {
    async fn translate(&self, question: &str) -> Result<QueryPlan, TranslateError> {
        Ok(self.plan_for(question))
    }

    fn kind(&self) -> String {
        "keyword".to_string()
    }
}
