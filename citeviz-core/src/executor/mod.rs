//! Query executor: turns a [`QueryPlan`] into a batch of analyzed records.
//!
//! Execution is a pure function of the plan and the loaded relations. Each
//! intent has its own aggregation strategy; unknown intents run as
//! `count_by_field`. Output is capped at [`MAX_RECORDS`] records.

pub mod histogram;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::plan::{Entity, Intent, Measure, QueryPlan, SortOrder};
use crate::store::relation::{Relation, as_number, float_number};
use crate::store::{COUNT_COLUMN, RelationQuery, TabularStore, VALUE_COLUMN};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

pub use histogram::{Bin, equal_width_bins};

/// Hard cap on records returned for any query.
pub const MAX_RECORDS: usize = 50;

/// One analyzed output row.
pub type Record = Map<String, Value>;

/// Executor output: records plus the roles of their fields.
///
/// Serializes as the bare record list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    category_field: Option<String>,
    value_field: Option<String>,
    records: Vec<Record>,
}

impl RecordBatch {
    /// A batch whose roles are inferred from key order.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            category_field: None,
            value_field: None,
            records,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_roles(
        records: Vec<Record>,
        category_field: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            category_field: Some(category_field.into()),
            value_field: Some(value_field.into()),
            records,
        }
    }

    /// The category (or x) field: the explicit role, else the first key of
    /// the first record, else `"category"`.
    pub fn category_field(&self) -> &str {
        self.category_field
            .as_deref()
            .or_else(|| self.positional_key(0))
            .unwrap_or("category")
    }

    /// The value (or y) field: the explicit role, else the second key of
    /// the first record, else `"value"`.
    pub fn value_field(&self) -> &str {
        self.value_field
            .as_deref()
            .or_else(|| self.positional_key(1))
            .unwrap_or("value")
    }

    fn positional_key(&self, position: usize) -> Option<&str> {
        self.records
            .first()
            .and_then(|r| r.keys().nth(position))
            .map(String::as_str)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for RecordBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

/// Runs query plans against a [`TabularStore`].
#[derive(Debug, Clone)]
pub struct QueryExecutor<'a> {
    store: &'a TabularStore,
    limits: AnalysisConfig,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a TabularStore) -> Self {
        Self::with_config(store, AnalysisConfig::default())
    }

    pub fn with_config(store: &'a TabularStore, limits: AnalysisConfig) -> Self {
        Self { store, limits }
    }

    fn max_records(&self) -> usize {
        self.limits.max_records.min(MAX_RECORDS)
    }

    /// Execute a plan.
    pub fn execute(&self, plan: &QueryPlan) -> Result<RecordBatch, AnalysisError> {
        let batch = match &plan.intent {
            Intent::CountByField | Intent::Comparison | Intent::Other(_) => {
                self.count_by_field(plan)?
            }
            Intent::TopRanking => self.top_ranking(plan)?,
            Intent::TrendAnalysis => self.trend_analysis(plan)?,
            Intent::Distribution => self.distribution(plan)?,
        };
        debug!(intent = %plan.intent, records = batch.len(), "Analysis complete");
        Ok(batch)
    }

    fn grouped(&self, plan: &QueryPlan, limit: Option<usize>) -> Result<Relation, AnalysisError> {
        let query = RelationQuery {
            groupby: Some(plan.groupby_or_default()),
            measure: plan.measure,
            aggregation_field: plan.aggregation_field.as_deref(),
            filters: Some(&plan.filters),
            limit,
            sort: plan.sort,
        };
        Ok(match plan.entity {
            Entity::Papers => self.store.query_papers(&query)?,
            Entity::Authors => self.store.query_authors(&RelationQuery {
                measure: Measure::Count,
                aggregation_field: None,
                filters: None,
                ..query
            }),
        })
    }

    fn count_by_field(&self, plan: &QueryPlan) -> Result<RecordBatch, AnalysisError> {
        let relation = self.grouped(plan, Some(self.max_records()))?;
        Ok(labelled(relation, plan.groupby_or_default(), "category", "value"))
    }

    fn trend_analysis(&self, plan: &QueryPlan) -> Result<RecordBatch, AnalysisError> {
        let groupby = plan.groupby_or_default();
        let ascending = QueryPlan {
            sort: SortOrder::Asc,
            ..plan.clone()
        };
        let relation = self
            .grouped(&ascending, None)?
            .sort_by_column(groupby, false)
            .head(self.max_records());
        Ok(labelled(relation, groupby, "x", "y"))
    }

    fn top_ranking(&self, plan: &QueryPlan) -> Result<RecordBatch, AnalysisError> {
        let limit = plan
            .limit
            .unwrap_or(self.limits.default_top_limit)
            .min(self.max_records());
        let field = plan.aggregation_field_or_default();

        match plan.entity {
            Entity::Papers => self.top_papers(field, limit),
            Entity::Authors => {
                let relation = self.store.query_authors(&RelationQuery {
                    aggregation_field: Some(field),
                    limit: Some(limit),
                    sort: SortOrder::Desc,
                    ..RelationQuery::default()
                });
                if relation.has_column("name") && relation.has_column(VALUE_COLUMN) {
                    Ok(RecordBatch::with_roles(
                        relation.to_records(),
                        "name",
                        VALUE_COLUMN,
                    ))
                } else {
                    Ok(RecordBatch::empty())
                }
            }
        }
    }

    fn top_papers(&self, field: &str, limit: usize) -> Result<RecordBatch, AnalysisError> {
        let Some(papers) = self.store.papers() else {
            return Ok(RecordBatch::empty());
        };
        let Some(values) = papers.column_values(field) else {
            return Ok(RecordBatch::empty());
        };

        let mut ranked = Vec::new();
        for (row, cell) in values.enumerate() {
            if let Some(v) = numeric_cell(field, cell)? {
                ranked.push((row, v));
            }
        }
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(limit);

        let records = ranked
            .into_iter()
            .map(|(row, v)| {
                let mut record = Record::new();
                let title = display_title(papers.get(row, "title"), self.limits.title_max_chars);
                record.insert("name".into(), Value::String(title));
                record.insert(VALUE_COLUMN.into(), float_number(v));
                record
            })
            .collect();
        Ok(RecordBatch::with_roles(records, "name", VALUE_COLUMN))
    }

    fn distribution(&self, plan: &QueryPlan) -> Result<RecordBatch, AnalysisError> {
        let field = plan.aggregation_field_or_default();
        let Some(cells) = self
            .store
            .relation(plan.entity)
            .and_then(|r| r.column_values(field))
        else {
            return Ok(RecordBatch::empty());
        };

        let mut values = Vec::new();
        for cell in cells {
            if let Some(v) = numeric_cell(field, cell)? {
                values.push(v);
            }
        }

        let records = equal_width_bins(&values, self.limits.max_bins)
            .into_iter()
            .filter(|bin| bin.count > 0)
            .take(self.max_records())
            .map(|bin| {
                let mut record = Record::new();
                record.insert(
                    "bin".into(),
                    Value::String(format!("{:.0}-{:.0}", bin.low, bin.high)),
                );
                record.insert("count".into(), Value::from(bin.count));
                record.insert("min".into(), float_number(bin.low));
                record.insert("max".into(), float_number(bin.high));
                record
            })
            .collect();
        Ok(RecordBatch::with_roles(records, "bin", "count"))
    }
}

/// Rename the group key and measure column of a grouped relation. A relation
/// that was not grouped (unknown key) passes through with positional roles.
fn labelled(relation: Relation, key: &str, category: &str, value: &str) -> RecordBatch {
    let measure = [COUNT_COLUMN, VALUE_COLUMN]
        .into_iter()
        .find(|c| relation.has_column(c));
    match measure {
        Some(measure) if relation.has_column(key) => {
            let relation = relation.rename_column(key, category).rename_column(measure, value);
            RecordBatch::with_roles(relation.to_records(), category, value)
        }
        _ => RecordBatch::new(relation.to_records()),
    }
}

/// `Some` for numbers, `None` for missing cells, an error for anything else.
fn numeric_cell(column: &str, cell: &Value) -> Result<Option<f64>, AnalysisError> {
    match cell {
        Value::Null => Ok(None),
        other => as_number(other)
            .map(Some)
            .ok_or_else(|| AnalysisError::NonNumeric {
                column: column.to_string(),
                value: other.to_string(),
            }),
    }
}

fn display_title(title: Option<&Value>, max_chars: usize) -> String {
    let title = match title {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Unknown".to_string(),
        Some(other) => other.to_string(),
    };
    let truncated: String = title.chars().take(max_chars).collect();
    format!("{truncated}...")
}
