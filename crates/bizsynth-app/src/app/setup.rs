use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use bizsynth_agents::{AgentRegistry, Orchestrator};
use bizsynth_llm_api::ModelGateway;

use crate::cli::Cli;
use crate::config::Settings;

/// Application state derived from CLI arguments, environment and config file
pub struct AppConfig {
    pub settings: Settings,
    pub registry: Arc<AgentRegistry>,
    pub gateway: Arc<ModelGateway>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Set up application state from CLI arguments
pub fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let settings = Settings::load(cli)?;
    build(settings)
}

/// Wire registry, gateway and orchestrator from resolved settings
pub fn build(settings: Settings) -> Result<AppConfig> {
    let registry = match &settings.agents_file {
        Some(path) => AgentRegistry::from_file(path)
            .with_context(|| format!("Failed to load agent registry {}", path.display()))?,
        None => AgentRegistry::embedded().context("Built-in agent registry is invalid")?,
    };
    let registry = Arc::new(registry);

    let gateway = Arc::new(
        ModelGateway::from_config(&settings.gateway).context("Failed to create model backends")?,
    );
    if !gateway.is_configured() {
        // not fatal here: `agents` works without a backend, requests fail with CONFIGURATION_ERROR
        eprintln!(
            "{} No model backend configured. Use --local-url and/or --remote-key (or BIZSYNTH_* variables).",
            "⚠️".yellow()
        );
    }

    let orchestrator = Orchestrator::new(settings.orchestrator.clone(), registry.clone(), gateway.clone())
        .context("Invalid orchestrator configuration")?;

    log::debug!(
        "Loaded {} agents; local backend: {}, remote backend: {}",
        registry.len(),
        settings.gateway.local.as_ref().map(|c| c.backend.as_str()).unwrap_or("none"),
        settings.gateway.remote.as_ref().map(|c| c.backend.as_str()).unwrap_or("none"),
    );

    Ok(AppConfig {
        settings,
        registry,
        gateway,
        orchestrator: Arc::new(orchestrator),
    })
}
