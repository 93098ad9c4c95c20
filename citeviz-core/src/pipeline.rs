//! The question-to-chart pipeline: translate, execute, render, explain.

use crate::chart::{self, ChartDocument};
use crate::config::AnalysisConfig;
use crate::error::TranslateError;
use crate::executor::{QueryExecutor, RecordBatch};
use crate::explain::explain;
use crate::plan::QueryPlan;
use crate::store::TabularStore;
use crate::translate::PlanTranslator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a caller sees for one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub query_plan: QueryPlan,
    pub data: RecordBatch,
    pub visualization: ChartDocument,
    pub explanation: String,
}

/// Shared, read-only pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<TabularStore>,
    translator: Arc<dyn PlanTranslator>,
    analysis: AnalysisConfig,
}

impl Pipeline {
    pub fn new(store: Arc<TabularStore>, translator: Arc<dyn PlanTranslator>) -> Self {
        Self {
            store,
            translator,
            analysis: AnalysisConfig::default(),
        }
    }

    pub fn with_analysis_config(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn store(&self) -> &TabularStore {
        &self.store
    }

    pub fn translator_kind(&self) -> String {
        self.translator.kind()
    }

    /// Run a plan. Analysis failures are logged and answered with an empty
    /// result and the placeholder chart.
    pub fn analyze(&self, plan: QueryPlan) -> Answer {
        let executor = QueryExecutor::with_config(&self.store, self.analysis.clone());
        let data = match executor.execute(&plan) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(intent = %plan.intent, error = %e, "Analysis failed; returning no results");
                RecordBatch::empty()
            }
        };
        debug!(records = data.len(), "Rendering visualization");
        let visualization = chart::render(&plan, &data);
        let explanation = explain(&plan, &data);
        Answer {
            query_plan: plan,
            data,
            visualization,
            explanation,
        }
    }

    /// Translate a question into a plan and run it.
    pub async fn ask(&self, question: &str) -> Result<Answer, TranslateError> {
        info!(question = %question, "Parsing query");
        let plan = self.translator.translate(question).await?;
        info!(intent = %plan.intent, entity = %plan.entity, "Analyzing data");
        Ok(self.analyze(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::NO_DATA_MESSAGE;
    use crate::explain::NO_RESULTS;
    use crate::plan::{Entity, Intent};
    use crate::store::Relation;
    use crate::translate::KeywordTranslator;
    use serde_json::json;

    fn pipeline() -> Pipeline {
        let papers = Relation::new(
            vec!["title".into(), "year".into(), "citations_count".into()],
            vec![
                vec![json!("A"), json!(2020), json!(3)],
                vec![json!("B"), json!(2021), json!("lots")],
            ],
        );
        let store = TabularStore::from_relations(Some(papers), None, None);
        Pipeline::new(Arc::new(store), Arc::new(KeywordTranslator))
    }

    #[test]
    fn test_analysis_error_becomes_empty_answer() {
        let plan = QueryPlan::new(Intent::TopRanking, Entity::Papers);
        let answer = pipeline().analyze(plan);
        assert!(answer.data.is_empty());
        assert_eq!(answer.visualization.description, NO_DATA_MESSAGE);
        assert_eq!(answer.explanation, NO_RESULTS);
    }

    #[tokio::test]
    async fn test_ask_with_keywords() {
        let answer = pipeline().ask("How many papers per year?").await.unwrap();
        assert_eq!(answer.query_plan.intent, Intent::CountByField);
        assert_eq!(answer.data.len(), 2);
        let json = serde_json::to_value(&answer).unwrap();
        assert!(json["data"].is_array());
        assert_eq!(json["query_plan"]["groupby"], "year");
    }
}
