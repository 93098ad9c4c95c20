//! Error types for the Citeviz core.
//!
//! Uses `thiserror` for public API error types with structured error variants,
//! one enum per stage of the pipeline.

use std::path::PathBuf;

/// Errors from reading relations and evaluating store queries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {relation} from {path}: {message}")]
    SourceRead {
        relation: String,
        path: PathBuf,
        message: String,
    },

    #[error("Malformed CSV for {relation}: {message}")]
    MalformedCsv { relation: String, message: String },

    #[error("Invalid threshold '{expression}' in filter on '{column}'")]
    InvalidThreshold { column: String, expression: String },
}

/// Errors raised while executing a query plan.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Store query failed: {0}")]
    Store(#[from] StoreError),

    #[error("Column '{column}' holds non-numeric value {value}")]
    NonNumeric { column: String, value: String },
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

/// Errors from turning a question into a query plan.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Plan is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Plan must be a JSON object, got {found}")]
    NotAnObject { found: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_store() {
        let err = StoreError::InvalidThreshold {
            column: "year".into(),
            expression: ">=abc".into(),
        };
        assert_eq!(err.to_string(), "Invalid threshold '>=abc' in filter on 'year'");
    }

    #[test]
    fn test_error_display_analysis_wraps_store() {
        let err = AnalysisError::from(StoreError::MalformedCsv {
            relation: "papers".into(),
            message: "unequal lengths".into(),
        });
        assert_eq!(
            err.to_string(),
            "Store query failed: Malformed CSV for papers: unequal lengths"
        );
    }

    #[test]
    fn test_error_display_source_read() {
        let err = StoreError::SourceRead {
            relation: "authors".into(),
            path: PathBuf::from("/data/author_nodes.csv"),
            message: "permission denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read authors from /data/author_nodes.csv: permission denied"
        );
    }

    #[test]
    fn test_translate_error_from_llm() {
        let err: TranslateError = LlmError::RateLimited {
            retry_after_secs: 60,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "LLM error: Rate limited by provider, retry after 60s"
        );
    }

    #[test]
    fn test_config_parse_error_display() {
        let err = ConfigError::ParseError {
            message: "invalid type: found string, expected u16".into(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration parse error: invalid type: found string, expected u16"
        );
    }
}
