//! Configuration system for Citeviz.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from the user config directory and/or `.citeviz/config.toml`
//! in the workspace directory. Environment variables use the `CITEVIZ_` prefix with
//! `__` separating sections, e.g. `CITEVIZ_SERVER__PORT=8080`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::GatewayConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CitevizConfig {
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub server: GatewayConfig,
    pub analysis: AnalysisConfig,
}

impl CitevizConfig {
    /// Reject settings that would make every query empty or the server
    /// unbindable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.max_records == 0 {
            return Err(ConfigError::Invalid {
                message: "analysis.max_records must be at least 1".to_string(),
            });
        }
        if self.analysis.max_bins == 0 {
            return Err(ConfigError::Invalid {
                message: "analysis.max_bins must be at least 1".to_string(),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Where the CSV relations live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the CSV files.
    pub data_dir: PathBuf,
    /// File name of the papers relation.
    pub papers_file: String,
    /// File name of the authors relation.
    pub authors_file: String,
    /// File name of the timeline relation.
    pub timeline_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            papers_file: "citation_nodes.csv".to_string(),
            authors_file: "author_nodes.csv".to_string(),
            timeline_file: "timeline.csv".to_string(),
        }
    }
}

/// LLM provider configuration for plan translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "dashscope" or "openai" (both OpenAI-compatible), or
    /// "keyword" to skip the model entirely.
    pub provider: String,
    /// Model identifier (e.g., "qwen-plus", "qwen-turbo").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Prefer `api_key_env`. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "dashscope".to_string(),
            model: "qwen-plus".to_string(),
            api_key_env: "DASHSCOPE_API_KEY".to_string(),
            api_key: None,
            base_url: Some("https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// The API key from the inline setting or the configured environment
    /// variable. Blank keys count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Limits applied by the query executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Hard cap on records per query.
    pub max_records: usize,
    /// Row count for `top_ranking` when the plan gives no limit.
    pub default_top_limit: usize,
    /// Upper bound on histogram bins.
    pub max_bins: usize,
    /// Characters of a paper title kept in rankings.
    pub title_max_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_records: 50,
            default_top_limit: 10,
            max_bins: 20,
            title_max_chars: 50,
        }
    }
}

/// Load configuration from all sources with layered merging.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides
/// 2. Environment variables (`CITEVIZ_` prefix)
/// 3. Workspace config (`.citeviz/config.toml`)
/// 4. User config (`<config dir>/citeviz/config.toml`)
/// 5. Defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&CitevizConfig>,
) -> Result<CitevizConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(CitevizConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("CITEVIZ_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Check whether any configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "citeviz", "citeviz")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".citeviz").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CitevizConfig::default();
        assert_eq!(config.llm.model, "qwen-plus");
        assert_eq!(config.llm.api_key_env, "DASHSCOPE_API_KEY");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.analysis.max_records, 50);
        assert_eq!(config.data.papers_file, "citation_nodes.csv");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = CitevizConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: CitevizConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.llm.model, config.llm.model);
        assert_eq!(deserialized.server.host, config.server.host);
        assert_eq!(deserialized.analysis.max_bins, config.analysis.max_bins);
        assert_eq!(deserialized.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CitevizConfig = toml::from_str("[analysis]\nmax_bins = 8\n").unwrap();
        assert_eq!(config.analysis.max_bins, 8);
        assert_eq!(config.analysis.max_records, 50);
        assert_eq!(config.llm.temperature, 0.7);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".citeviz");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[data]\ndata_dir = \"/srv/citeviz\"\n\n[server]\nport = 9090\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.data.data_dir, PathBuf::from("/srv/citeviz"));
        assert_eq!(config.server.port, 9090);
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = CitevizConfig::default();
        overrides.llm.provider = "keyword".to_string();
        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.llm.provider, "keyword");
    }

    #[test]
    fn test_load_config_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".citeviz");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[server]\nport = \"high\"\n").unwrap();

        let err = load_config(Some(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_inline_api_key_is_not_serialized() {
        let mut config = CitevizConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("sk-secret"));
        assert!(!toml_str.contains("api_key ="));
        assert!(toml_str.contains("api_key_env"));
    }

    #[test]
    fn test_validate() {
        assert!(CitevizConfig::default().validate().is_ok());
        let mut config = CitevizConfig::default();
        config.analysis.max_bins = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_resolve_api_key_prefers_inline() {
        let config = LlmConfig {
            api_key: Some("sk-inline".to_string()),
            api_key_env: "CITEVIZ_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-inline"));
    }

    #[test]
    fn test_resolve_api_key_blank_is_none() {
        let config = LlmConfig {
            api_key: Some("  ".to_string()),
            api_key_env: "CITEVIZ_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolve_api_key(), None);
    }
}
