//! # citeviz-core: Question-driven analytics over publication data
//!
//! Citeviz answers natural-language questions about scientific papers,
//! authors, and citation timelines. A question becomes a [`QueryPlan`], the
//! plan runs against the in-memory [`TabularStore`], and the resulting
//! records are rendered as a Vega-Lite [`ChartDocument`].
//!
//! The core path (store, executor, chart templates) is synchronous and
//! deterministic. Translation and the HTTP gateway are async adapters
//! around it.

pub mod chart;
pub mod config;
pub mod error;
pub mod executor;
pub mod explain;
pub mod gateway;
pub mod pipeline;
pub mod plan;
pub mod providers;
pub mod store;
pub mod translate;

// Re-exports
pub use chart::{ChartDocument, ChartKind, NO_DATA_MESSAGE, empty_chart, render};
pub use config::{AnalysisConfig, CitevizConfig, DataConfig, LlmConfig, config_exists, load_config};
pub use error::{AnalysisError, ConfigError, LlmError, StoreError, TranslateError};
pub use executor::{MAX_RECORDS, QueryExecutor, Record, RecordBatch};
pub use gateway::{GatewayConfig, GatewayState, SharedGateway};
pub use pipeline::{Answer, Pipeline};
pub use plan::{Entity, Intent, Measure, QueryPlan, SortOrder};
pub use providers::{LlmProvider, MockLlmProvider, OpenAiCompatibleProvider};
pub use store::{
    CsvDirectorySource, DataSummary, MemorySource, Relation, RelationName, RelationSource,
    TabularStore,
};
pub use translate::{KeywordTranslator, LlmPlanTranslator, PlanTranslator};
