//! Relation sources: where the three logical relations are read from.

use super::relation::Relation;
use crate::config::DataConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The fixed logical names a source is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationName {
    Papers,
    Authors,
    Timeline,
}

impl RelationName {
    pub const ALL: [RelationName; 3] = [Self::Papers, Self::Authors, Self::Timeline];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Papers => "papers",
            Self::Authors => "authors",
            Self::Timeline => "timeline",
        }
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for reading relations from storage.
#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Read one relation. `Ok(None)` means the source simply does not have it.
    async fn read(&self, name: RelationName) -> Result<Option<Relation>, StoreError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// CsvDirectorySource
// ---------------------------------------------------------------------------

/// Reads each relation from a CSV file inside one directory.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
    files: HashMap<RelationName, String>,
}

impl CsvDirectorySource {
    /// A source using the default file names.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&DataConfig {
            data_dir: dir.into(),
            ..DataConfig::default()
        })
    }

    pub fn from_config(config: &DataConfig) -> Self {
        let files = HashMap::from([
            (RelationName::Papers, config.papers_file.clone()),
            (RelationName::Authors, config.authors_file.clone()),
            (RelationName::Timeline, config.timeline_file.clone()),
        ]);
        Self {
            dir: config.data_dir.clone(),
            files,
        }
    }

    pub fn path_for(&self, name: RelationName) -> PathBuf {
        let file = self
            .files
            .get(&name)
            .cloned()
            .unwrap_or_else(|| format!("{}.csv", name));
        self.dir.join(file)
    }
}

#[async_trait]
impl RelationSource for CsvDirectorySource {
    async fn read(&self, name: RelationName) -> Result<Option<Relation>, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| read_error(name, &path, e))?;
        parse_csv(&content)
            .map(Some)
            .map_err(|e| StoreError::MalformedCsv {
                relation: name.to_string(),
                message: e.to_string(),
            })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

fn read_error(name: RelationName, path: &Path, err: std::io::Error) -> StoreError {
    StoreError::SourceRead {
        relation: name.to_string(),
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Parse CSV text with a header row into a relation, inferring scalar types
/// per cell.
pub fn parse_csv(content: &str) -> Result<Relation, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(infer_scalar).collect());
    }
    Ok(Relation::new(columns, rows))
}

const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Infer a scalar from one CSV field: missing marker, integer, float, or text.
pub fn infer_scalar(raw: &str) -> Value {
    let s = raw.trim();
    if MISSING_MARKERS.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// A source backed by relations already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    relations: HashMap<RelationName, Relation>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relation(mut self, name: RelationName, relation: Relation) -> Self {
        self.relations.insert(name, relation);
        self
    }
}

#[async_trait]
impl RelationSource for MemorySource {
    async fn read(&self, name: RelationName) -> Result<Option<Relation>, StoreError> {
        Ok(self.relations.get(&name).cloned())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
