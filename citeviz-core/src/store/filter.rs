//! Row filters from a plan's `filters` map.
//!
//! The grammar is deliberately small: a string starting with `>=` or `<=`
//! is a numeric threshold, anything else is an equality test.

use super::relation::{Relation, as_number, values_equal};
use crate::error::StoreError;
use serde_json::{Map, Value};

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(Value),
    AtLeast(f64),
    AtMost(f64),
}

impl Filter {
    /// Parse a filter value for `column`.
    pub fn parse(column: &str, raw: &Value) -> Result<Self, StoreError> {
        let Value::String(text) = raw else {
            return Ok(Self::Equals(raw.clone()));
        };
        if let Some(rest) = text.strip_prefix(">=") {
            return threshold(column, text, rest).map(Self::AtLeast);
        }
        if let Some(rest) = text.strip_prefix("<=") {
            return threshold(column, text, rest).map(Self::AtMost);
        }
        Ok(Self::Equals(raw.clone()))
    }

    /// Whether a cell satisfies the predicate. Missing and non-numeric
    /// cells never satisfy a threshold.
    pub fn matches(&self, cell: &Value) -> bool {
        match self {
            Self::Equals(expected) => values_equal(cell, expected),
            Self::AtLeast(bound) => as_number(cell).is_some_and(|v| v >= *bound),
            Self::AtMost(bound) => as_number(cell).is_some_and(|v| v <= *bound),
        }
    }
}

fn threshold(column: &str, expression: &str, rest: &str) -> Result<f64, StoreError> {
    rest.trim()
        .parse::<f64>()
        .map_err(|_| StoreError::InvalidThreshold {
            column: column.to_string(),
            expression: expression.to_string(),
        })
}

/// Apply every filter whose column exists; filters on unknown columns are
/// skipped.
pub fn apply_filters(
    relation: &Relation,
    filters: &Map<String, Value>,
) -> Result<Relation, StoreError> {
    let mut predicates = Vec::new();
    for (column, raw) in filters {
        match relation.column_index(column) {
            Some(idx) => predicates.push((idx, Filter::parse(column, raw)?)),
            None => tracing::debug!(column = %column, "Skipping filter on unknown column"),
        }
    }
    if predicates.is_empty() {
        return Ok(relation.clone());
    }
    Ok(relation.filter_rows(|row| {
        predicates
            .iter()
            .all(|(idx, filter)| filter.matches(&row[*idx]))
    }))
}
