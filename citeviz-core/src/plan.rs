//! The structured query plan handed to the executor.
//!
//! Plans usually come from an LLM, so deserialization is lenient: unknown
//! intents, measures, and sort orders map to their fallbacks instead of
//! failing, and `limit` accepts numbers or numeric strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The analysis a plan asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    #[default]
    CountByField,
    TopRanking,
    TrendAnalysis,
    Distribution,
    Comparison,
    /// Any other intent string; executed as `count_by_field`.
    Other(String),
}

impl Intent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CountByField => "count_by_field",
            Self::TopRanking => "top_ranking",
            Self::TrendAnalysis => "trend_analysis",
            Self::Distribution => "distribution",
            Self::Comparison => "comparison",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Intent {
    fn from(value: String) -> Self {
        match value.trim() {
            "count_by_field" => Self::CountByField,
            "top_ranking" => Self::TopRanking,
            "trend_analysis" => Self::TrendAnalysis,
            "distribution" => Self::Distribution,
            "comparison" => Self::Comparison,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for Intent {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.as_str().to_string()
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which relation a plan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Entity {
    #[default]
    Papers,
    Authors,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Papers => "papers",
            Self::Authors => "authors",
        }
    }
}

impl From<String> for Entity {
    fn from(value: String) -> Self {
        if value.to_lowercase().contains("author") {
            Self::Authors
        } else {
            Self::Papers
        }
    }
}

impl From<Entity> for String {
    fn from(entity: Entity) -> Self {
        entity.as_str().to_string()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate applied per group. Unrecognised names fall back to `Count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Measure {
    #[default]
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

impl From<String> for Measure {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "sum" | "total" => Self::Sum,
            "avg" | "mean" | "average" => Self::Avg,
            "max" | "maximum" => Self::Max,
            "min" | "minimum" => Self::Min,
            _ => Self::Count,
        }
    }
}

impl From<Measure> for String {
    fn from(measure: Measure) -> Self {
        measure.as_str().to_string()
    }
}

/// Result ordering. Anything other than `asc` means descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, Self::Desc)
    }
}

impl From<String> for SortOrder {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Self::Asc,
            _ => Self::Desc,
        }
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        order.as_str().to_string()
    }
}

/// A structured description of the analysis to run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPlan {
    pub intent: Intent,
    pub entity: Entity,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub groupby: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub measure: Measure,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub aggregation_field: Option<String>,
    /// Column to equality value, or to a `">=N"` / `"<=N"` threshold string.
    #[serde(default, deserialize_with = "lenient_filters")]
    pub filters: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_limit", skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub sort: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
    /// Fields the plan producer added that the executor does not read.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryPlan {
    pub fn new(intent: Intent, entity: Entity) -> Self {
        Self {
            intent,
            entity,
            ..Self::default()
        }
    }

    pub fn with_groupby(mut self, column: impl Into<String>) -> Self {
        self.groupby = Some(column.into());
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_aggregation_field(mut self, column: impl Into<String>) -> Self {
        self.aggregation_field = Some(column.into());
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// The grouping column, `year` when the plan names none.
    pub fn groupby_or_default(&self) -> &str {
        self.groupby.as_deref().unwrap_or("year")
    }

    /// The aggregation column, `citations_count` when the plan names none.
    pub fn aggregation_field_or_default(&self) -> &str {
        self.aggregation_field.as_deref().unwrap_or("citations_count")
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_enum<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String> + Default,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => T::from(s),
        _ => T::default(),
    })
}

fn lenient_filters<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}

fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_defaults() {
        let plan: QueryPlan =
            serde_json::from_value(json!({"intent": "top_ranking", "entity": "papers"})).unwrap();
        assert_eq!(plan.intent, Intent::TopRanking);
        assert_eq!(plan.measure, Measure::Count);
        assert_eq!(plan.sort, SortOrder::Desc);
        assert!(plan.filters.is_empty());
        assert_eq!(plan.limit, None);
        assert_eq!(plan.groupby_or_default(), "year");
        assert_eq!(plan.aggregation_field_or_default(), "citations_count");
    }

    #[test]
    fn test_unknown_intent_is_preserved() {
        let plan: QueryPlan =
            serde_json::from_value(json!({"intent": "scatter", "entity": "papers"})).unwrap();
        assert_eq!(plan.intent, Intent::Other("scatter".into()));
        let echoed = serde_json::to_value(&plan).unwrap();
        assert_eq!(echoed["intent"], "scatter");
    }

    #[test]
    fn test_lenient_fields() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "intent": "top_ranking",
            "entity": "Authors",
            "measure": "mean",
            "limit": "5",
            "filters": null,
            "groupby": null,
            "sort": "ascending",
        }))
        .unwrap();
        assert_eq!(plan.entity, Entity::Authors);
        assert_eq!(plan.measure, Measure::Avg);
        assert_eq!(plan.limit, Some(5));
        assert!(plan.filters.is_empty());
        assert_eq!(plan.groupby, None);
        assert_eq!(plan.sort, SortOrder::Asc);
    }

    #[test]
    fn test_null_measure_and_sort_take_defaults() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "intent": "count_by_field",
            "entity": "papers",
            "measure": null,
            "sort": null,
        }))
        .unwrap();
        assert_eq!(plan.measure, Measure::Count);
        assert_eq!(plan.sort, SortOrder::Desc);
    }

    #[test]
    fn test_unparseable_limit_is_dropped() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "intent": "top_ranking",
            "entity": "papers",
            "limit": "number for top N queries",
        }))
        .unwrap();
        assert_eq!(plan.limit, None);
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "intent": "distribution",
            "entity": "papers",
            "note": "from the parser",
        }))
        .unwrap();
        assert_eq!(plan.extra["note"], "from the parser");
        let echoed = serde_json::to_value(&plan).unwrap();
        assert_eq!(echoed["note"], "from the parser");
        assert_eq!(echoed["sort"], "desc");
    }

    #[test]
    fn test_builder() {
        let plan = QueryPlan::new(Intent::CountByField, Entity::Papers)
            .with_groupby("field")
            .with_filter("year", ">=2019")
            .with_limit(3)
            .with_sort(SortOrder::Asc);
        assert_eq!(plan.groupby_or_default(), "field");
        assert_eq!(plan.filters["year"], json!(">=2019"));
        assert_eq!(plan.limit, Some(3));
    }
}
