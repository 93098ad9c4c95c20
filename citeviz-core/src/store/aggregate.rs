//! Group-by aggregation over a relation.

use super::relation::{Relation, as_number, float_number, group_key, integral_number};
use crate::plan::Measure;
use serde_json::Value;
use std::collections::HashMap;

/// Output column for group sizes.
pub const COUNT_COLUMN: &str = "count";
/// Output column for `sum`/`avg`/`max`/`min` aggregates.
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug, Default)]
struct Accumulator {
    rows: usize,
    numeric: usize,
    sum: f64,
    max: Option<f64>,
    min: Option<f64>,
    all_integers: bool,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            all_integers: true,
            ..Self::default()
        }
    }

    fn push(&mut self, cell: Option<&Value>) {
        self.rows += 1;
        let Some(cell) = cell else { return };
        let Some(v) = as_number(cell) else { return };
        self.numeric += 1;
        self.sum += v;
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        if !(cell.is_i64() || cell.is_u64()) {
            self.all_integers = false;
        }
    }

    fn finish(&self, measure: Measure) -> Value {
        let exact = |v: f64| {
            if self.all_integers {
                integral_number(v)
            } else {
                float_number(v)
            }
        };
        match measure {
            Measure::Count => Value::from(self.rows),
            Measure::Sum => exact(self.sum),
            Measure::Avg if self.numeric == 0 => Value::Null,
            Measure::Avg => float_number(self.sum / self.numeric as f64),
            Measure::Max => self.max.map_or(Value::Null, exact),
            Measure::Min => self.min.map_or(Value::Null, exact),
        }
    }
}

/// Group `relation` by `key`, one row per distinct non-null key in order of
/// first appearance.
///
/// `Measure::Count` yields `[key, count]`. Other measures aggregate `field`
/// into `[key, value]`; without a usable `field` they fall back to count.
pub fn group_by(
    relation: &Relation,
    key: &str,
    measure: Measure,
    field: Option<&str>,
) -> Relation {
    let Some(key_idx) = relation.column_index(key) else {
        return relation.clone();
    };
    let field_idx = field.and_then(|f| relation.column_index(f));
    let (measure, out_column) = match (measure, field_idx) {
        (Measure::Count, _) | (_, None) => (Measure::Count, COUNT_COLUMN),
        (m, Some(_)) => (m, VALUE_COLUMN),
    };

    let mut order: Vec<(Value, Accumulator)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in relation.rows() {
        let group = &row[key_idx];
        if group.is_null() {
            continue;
        }
        let slot = *index.entry(group_key(group)).or_insert_with(|| {
            order.push((group.clone(), Accumulator::new()));
            order.len() - 1
        });
        order[slot].1.push(field_idx.map(|i| &row[i]));
    }

    let rows = order
        .into_iter()
        .map(|(group, acc)| vec![group, acc.finish(measure)])
        .collect();
    Relation::new(vec![key.to_string(), out_column.to_string()], rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn papers() -> Relation {
        Relation::new(
            vec!["field".into(), "citations_count".into()],
            vec![
                vec![json!("AI"), json!(10)],
                vec![json!("Bio"), json!(3)],
                vec![json!("AI"), json!(20)],
                vec![Value::Null, json!(7)],
                vec![json!("Bio"), Value::Null],
            ],
        )
    }

    #[test]
    fn test_count_skips_null_groups() {
        let rel = group_by(&papers(), "field", Measure::Count, None);
        assert_eq!(rel.columns(), &["field".to_string(), "count".to_string()]);
        assert_eq!(rel.rows()[0], vec![json!("AI"), json!(2)]);
        assert_eq!(rel.rows()[1], vec![json!("Bio"), json!(2)]);
        assert_eq!(rel.len(), 2);
    }

    #[test]
    fn test_sum_keeps_integers() {
        let rel = group_by(&papers(), "field", Measure::Sum, Some("citations_count"));
        assert_eq!(rel.columns()[1], "value");
        assert_eq!(rel.rows()[0], vec![json!("AI"), json!(30)]);
        assert_eq!(rel.rows()[1], vec![json!("Bio"), json!(3)]);
    }

    #[test]
    fn test_avg_ignores_missing_values() {
        let rel = group_by(&papers(), "field", Measure::Avg, Some("citations_count"));
        assert_eq!(rel.rows()[0][1], json!(15.0));
        assert_eq!(rel.rows()[1][1], json!(3.0));
    }

    #[test]
    fn test_max_and_min() {
        let max = group_by(&papers(), "field", Measure::Max, Some("citations_count"));
        let min = group_by(&papers(), "field", Measure::Min, Some("citations_count"));
        assert_eq!(max.rows()[0][1], json!(20));
        assert_eq!(min.rows()[0][1], json!(10));
    }

    #[test]
    fn test_unknown_field_falls_back_to_count() {
        let rel = group_by(&papers(), "field", Measure::Sum, Some("h_index"));
        assert_eq!(rel.columns()[1], "count");
        assert_eq!(rel.rows()[0][1], json!(2));
    }

    #[test]
    fn test_groups_match_int_and_float_keys() {
        let rel = Relation::new(
            vec!["year".into()],
            vec![vec![json!(2020)], vec![json!(2020.0)], vec![json!(2021)]],
        );
        let grouped = group_by(&rel, "year", Measure::Count, None);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.rows()[0], vec![json!(2020), json!(2)]);
    }

    #[test]
    fn test_large_integer_ids_stay_distinct() {
        let rel = Relation::new(
            vec!["id".into()],
            vec![
                vec![json!(9_007_199_254_740_992_i64)],
                vec![json!(9_007_199_254_740_993_i64)],
            ],
        );
        let grouped = group_by(&rel, "id", Measure::Count, None);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.rows()[1], vec![json!(9_007_199_254_740_993_i64), json!(1)]);
    }

    #[test]
    fn test_negative_zero_joins_zero() {
        let rel = Relation::new(
            vec!["score".into()],
            vec![vec![json!(0)], vec![json!(-0.0)], vec![json!(1)]],
        );
        let grouped = group_by(&rel, "score", Measure::Count, None);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.rows()[0], vec![json!(0), json!(2)]);
    }
}
