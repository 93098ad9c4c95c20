//! CLI subcommand handlers.

use crate::{Commands, ConfigAction};
use citeviz_core::gateway::{self, GatewayState};
use citeviz_core::{CitevizConfig, CsvDirectorySource, Pipeline, QueryPlan, TabularStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    data_dir: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace),
        Commands::Serve { host, port } => {
            let mut config = load(workspace, data_dir)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            handle_serve(config).await
        }
        Commands::Ask { question } => {
            let config = load(workspace, data_dir)?;
            let pipeline = build_pipeline(&config).await;
            let answer = pipeline.ask(&question).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(())
        }
        Commands::Analyze { plan, file } => {
            let raw = match (plan, file) {
                (Some(plan), _) => plan,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("Failed to read plan from {}: {}", path.display(), e)
                })?,
                (None, None) => anyhow::bail!("Provide a plan as JSON or with --file"),
            };
            let plan: QueryPlan = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("Invalid query plan: {}", e))?;
            let config = load(workspace, data_dir)?;
            let pipeline = build_pipeline(&config).await;
            let answer = pipeline.analyze(plan);
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(())
        }
        Commands::Summary => {
            let config = load(workspace, data_dir)?;
            let store = load_store(&config).await;
            println!("{}", serde_json::to_string_pretty(&store.summary())?);
            Ok(())
        }
    }
}

fn load(workspace: &Path, data_dir: Option<&Path>) -> anyhow::Result<CitevizConfig> {
    let mut config = citeviz_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(dir) = data_dir {
        config.data.data_dir = dir.to_path_buf();
    }
    config.validate()?;
    Ok(config)
}

async fn load_store(config: &CitevizConfig) -> TabularStore {
    let source = CsvDirectorySource::from_config(&config.data);
    TabularStore::load(&source).await
}

async fn build_pipeline(config: &CitevizConfig) -> Pipeline {
    let store = load_store(config).await;
    let translator = citeviz_core::translate::from_config(&config.llm);
    Pipeline::new(Arc::new(store), translator).with_analysis_config(config.analysis.clone())
}

async fn handle_serve(config: CitevizConfig) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&config).await;
    info!(
        translator = %pipeline.translator_kind(),
        host = %config.server.host,
        port = config.server.port,
        "Starting gateway"
    );
    let state = GatewayState::new(pipeline, config.server).shared();
    gateway::run(state).await?;
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".citeviz");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&CitevizConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = citeviz_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
