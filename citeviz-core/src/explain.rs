//! One-paragraph explanations of an analysis result.

use crate::executor::RecordBatch;
use crate::plan::{Intent, QueryPlan};

/// Explanation used when a query produced no records.
pub const NO_RESULTS: &str = "No data found matching your query.";

/// Describe a result in a sentence or two, keyed off the plan's intent and
/// entity and the number of records.
pub fn explain(plan: &QueryPlan, batch: &RecordBatch) -> String {
    if batch.is_empty() {
        return NO_RESULTS.to_string();
    }
    let n = batch.len();
    let entity = plan.entity;
    match &plan.intent {
        Intent::CountByField => {
            let groupby = plan.groupby.as_deref().unwrap_or("category");
            format!(
                "Found {n} distinct {groupby} categories. The chart shows the distribution of {entity} across these categories."
            )
        }
        Intent::TopRanking => {
            let shown = plan.limit.unwrap_or(10).min(n);
            format!(
                "Here are the top {shown} {entity} ranked by the specified metric. The chart shows their relative performance."
            )
        }
        Intent::TrendAnalysis => format!(
            "The chart shows how {entity} have changed over time. Found {n} time points in the data."
        ),
        Intent::Distribution => format!(
            "This histogram shows the distribution of values across {n} bins, helping you understand the data spread."
        ),
        Intent::Comparison | Intent::Other(_) => format!(
            "Analysis complete with {n} data points. The visualization shows the key insights from your query."
        ),
    }
}
