//! In-memory relations and the scalar helpers shared by store queries.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// An ordered, immutable table of rows with a fixed set of named columns.
///
/// Cells are `serde_json::Value` scalars: strings, numbers, or `Null` for
/// missing data. Every query derives a new relation; nothing mutates a
/// loaded one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Relation {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Relation {
    /// Build a relation, padding short rows with `Null` and dropping
    /// surplus cells so every row matches the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a relation from JSON objects, taking columns from the first one.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let Some(first) = records.first() else {
            return Self::empty();
        };
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, in row order.
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = &'a Value> + use<'a>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Rows as JSON objects whose keys follow column order.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }

    /// Keep the rows for which `keep` returns true.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Value]) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r.as_slice())).cloned().collect(),
        }
    }

    /// Project onto `(column, alias)` pairs. Unknown columns are skipped.
    pub fn project(&self, columns: &[(&str, &str)]) -> Self {
        let picked: Vec<(usize, String)> = columns
            .iter()
            .filter_map(|(name, alias)| self.column_index(name).map(|i| (i, alias.to_string())))
            .collect();
        Self {
            columns: picked.iter().map(|(_, alias)| alias.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picked.iter().map(|(i, _)| row[*i].clone()).collect())
                .collect(),
        }
    }

    pub fn rename_column(mut self, from: &str, to: &str) -> Self {
        if let Some(col) = self.columns.iter_mut().find(|c| c.as_str() == from) {
            *col = to.to_string();
        }
        self
    }

    /// Stable sort on one column. Missing values always sort last.
    pub fn sort_by_column(mut self, name: &str, descending: bool) -> Self {
        if let Some(idx) = self.column_index(name) {
            self.rows.sort_by(|a, b| {
                let (a, b) = (&a[idx], &b[idx]);
                match (a.is_null(), b.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) if descending => compare_values(b, a),
                    (false, false) => compare_values(a, b),
                }
            });
        }
        self
    }

    /// Keep the first `n` rows.
    pub fn head(mut self, n: usize) -> Self {
        self.rows.truncate(n);
        self
    }
}

/// Numeric view of a cell. Only JSON numbers count as numeric.
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Natural ordering of scalars: numbers numerically, strings lexically,
/// numbers before strings, `Null` after everything.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Canonical form of a JSON number. Integers compare exactly at any
/// magnitude; floats with no fraction join the matching integer, and `-0.0`
/// is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NumericKey {
    Int(i128),
    Float(u64),
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

fn numeric_key(number: &Number) -> Option<NumericKey> {
    if let Some(i) = number.as_i64() {
        return Some(NumericKey::Int(i128::from(i)));
    }
    if let Some(u) = number.as_u64() {
        return Some(NumericKey::Int(i128::from(u)));
    }
    let f = number.as_f64()?;
    if f.fract() == 0.0 && f.abs() < TWO_POW_63 {
        Some(NumericKey::Int(f as i128))
    } else {
        Some(NumericKey::Float(f.to_bits()))
    }
}

/// Equality used by filters and grouping: `2020` equals `2020.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numeric_key(x) == numeric_key(y),
        _ => a == b,
    }
}

/// A hashable key for a group value, consistent with [`values_equal`].
pub(crate) fn group_key(value: &Value) -> String {
    match value {
        Value::Number(n) => match numeric_key(n) {
            Some(NumericKey::Int(i)) => format!("i:{i}"),
            Some(NumericKey::Float(bits)) => format!("f:{bits:x}"),
            None => format!("n:{n}"),
        },
        other => other.to_string(),
    }
}

/// JSON number for a float, keeping integral values as integers.
pub fn integral_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        float_number(value)
    }
}

/// JSON number for a float; non-finite values become `Null`.
pub fn float_number(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}
