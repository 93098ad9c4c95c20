//! Chart template selection: analyzed records to a Vega-Lite document.
//!
//! Rendering is template based and deterministic. The intent picks one of
//! four archetypes; an empty batch always renders a placeholder text chart.

use crate::executor::{Record, RecordBatch};
use crate::plan::{Intent, QueryPlan};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Placeholder shown when a query produced no records.
pub const NO_DATA_MESSAGE: &str = "No data available for this query";

const WIDTH: u32 = 600;
const HEIGHT: u32 = 400;

/// A rendered chart: a short description and the Vega-Lite spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDocument {
    pub description: String,
    pub spec: Value,
}

impl ChartDocument {
    /// The records embedded in `spec.data.values`.
    pub fn data_values(&self) -> &[Value] {
        self.spec
            .pointer("/data/values")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty_chart(&self) -> bool {
        self.spec.get("mark") == Some(&Value::String("text".into()))
    }
}

/// Chart archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    VerticalBar,
    HorizontalBar,
    Line,
    Histogram,
}

impl ChartKind {
    pub fn for_intent(intent: &Intent) -> Self {
        match intent {
            Intent::TopRanking => Self::HorizontalBar,
            Intent::TrendAnalysis => Self::Line,
            Intent::Distribution => Self::Histogram,
            Intent::CountByField | Intent::Comparison | Intent::Other(_) => Self::VerticalBar,
        }
    }
}

/// Render a batch for a plan.
pub fn render(plan: &QueryPlan, batch: &RecordBatch) -> ChartDocument {
    if batch.is_empty() {
        return empty_chart(NO_DATA_MESSAGE);
    }
    match ChartKind::for_intent(&plan.intent) {
        ChartKind::VerticalBar => bar_chart(batch, false),
        ChartKind::HorizontalBar => bar_chart(batch, true),
        ChartKind::Line => line_chart(batch),
        ChartKind::Histogram => histogram(batch),
    }
}

/// A text-mark chart carrying `message` and no data.
pub fn empty_chart(message: &str) -> ChartDocument {
    ChartDocument {
        description: message.to_string(),
        spec: json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": {"values": []},
            "mark": "text",
            "encoding": {
                "text": {"value": message}
            },
            "width": WIDTH,
            "height": HEIGHT
        }),
    }
}

fn bar_chart(batch: &RecordBatch, horizontal: bool) -> ChartDocument {
    let category = batch.category_field();
    let value = batch.value_field();
    let values = text_coerced(batch.records(), category);

    let (x_field, x_type, y_field, y_type) = if horizontal {
        (value, "quantitative", category, "nominal")
    } else {
        (category, "nominal", value, "quantitative")
    };

    let label_angle = if horizontal { 0 } else { -45 };
    let y_sort = if horizontal { json!("-x") } else { Value::Null };

    let spec = json!({
        "$schema": VEGA_LITE_SCHEMA,
        "data": {"values": values},
        "mark": {"type": "bar", "tooltip": true},
        "encoding": {
            "x": {
                "field": x_field,
                "type": x_type,
                "title": axis_title(x_field),
                "axis": {
                    "labelAngle": label_angle,
                    "labelOverlap": false,
                    "labelPadding": 10
                }
            },
            "y": {
                "field": y_field,
                "type": y_type,
                "title": axis_title(y_field),
                "sort": y_sort
            },
            "color": {
                "field": category,
                "type": "nominal",
                "legend": null
            },
            "tooltip": tooltips(category, value)
        },
        "config": base_config(),
        "width": WIDTH,
        "height": HEIGHT
    });

    ChartDocument {
        description: format!("Bar chart showing {category} by {value}"),
        spec,
    }
}

fn line_chart(batch: &RecordBatch) -> ChartDocument {
    let x = batch.category_field();
    let y = batch.value_field();
    let values = text_coerced(batch.records(), x);

    let spec = json!({
        "$schema": VEGA_LITE_SCHEMA,
        "data": {"values": values},
        "mark": {"type": "line", "point": true, "tooltip": true},
        "encoding": {
            "x": {
                "field": x,
                "type": "nominal",
                "title": axis_title(x),
                "sort": null,
                "axis": {
                    "labelAngle": 0,
                    "labelOverlap": false,
                    "labelPadding": 10
                }
            },
            "y": {
                "field": y,
                "type": "quantitative",
                "title": axis_title(y)
            },
            "tooltip": tooltips(x, y)
        },
        "config": base_config(),
        "width": WIDTH,
        "height": HEIGHT
    });

    ChartDocument {
        description: format!("Trend of {y} over {x}"),
        spec,
    }
}

fn histogram(batch: &RecordBatch) -> ChartDocument {
    let spec = json!({
        "$schema": VEGA_LITE_SCHEMA,
        "data": {"values": batch.records()},
        "mark": {"type": "bar", "tooltip": true},
        "encoding": {
            "x": {"field": "bin", "type": "nominal", "title": "Range"},
            "y": {"field": "count", "type": "quantitative", "title": "Count"},
            "tooltip": [
                {"field": "bin", "type": "nominal"},
                {"field": "count", "type": "quantitative"}
            ]
        },
        "config": {
            "view": {"stroke": null},
            "axis": {"labelAngle": -45}
        },
        "width": WIDTH,
        "height": HEIGHT
    });

    ChartDocument {
        description: "Distribution histogram".to_string(),
        spec,
    }
}

fn tooltips(category: &str, value: &str) -> Value {
    json!([
        {"field": category, "type": "nominal", "title": axis_title(category)},
        {"field": value, "type": "quantitative", "title": axis_title(value)}
    ])
}

fn base_config() -> Value {
    json!({
        "view": {"stroke": null},
        "axis": {"labelFontSize": 12, "titleFontSize": 14}
    })
}

/// Copy records with the `field` values rendered as text.
fn text_coerced(records: &[Record], field: &str) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if let Some(cell) = record.get_mut(field) {
                *cell = Value::String(display_text(cell));
            }
            record
        })
        .collect()
}

/// Text form of a scalar: strings verbatim, integers without a fraction,
/// floats always with one (`2020.0`), missing values as `None`.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 => format!("{f:.1}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Axis title from a field name: underscores become spaces and each word is
/// capitalized (`citations_count` -> `Citations Count`).
pub fn axis_title(field: &str) -> String {
    let mut title = String::with_capacity(field.len());
    let mut at_word_start = true;
    for c in field.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if at_word_start {
                title.extend(c.to_uppercase());
            } else {
                title.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            title.push(c);
            at_word_start = true;
        }
    }
    title
}
