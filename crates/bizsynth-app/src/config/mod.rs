use anyhow::{Context, Result};
use bizsynth_agents::OrchestratorConfig;
use bizsynth_llm_api::{BackendConfig, BackendType, GatewayConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

pub mod helpers;

use helpers::{get_backend_vars_from_env, parse_backend, parse_number};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "bizsynth.toml";

/// Everything the binary needs to build a gateway and an orchestrator
///
/// Layered as CLI flags > `BIZSYNTH_*` environment > TOML file > defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gateway: GatewayConfig,
    pub orchestrator: OrchestratorConfig,
    /// Registry JSON to load instead of the built-in agents
    pub agents_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Resolve the full configuration for one invocation
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::load_with(cli, |key| env::var(key).ok())
    }

    /// Same as [`Settings::load`] with an explicit environment lookup
    pub fn load_with(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        Overrides::from_env(&lookup)?.apply(&mut settings);
        Overrides::from_cli(cli)?.apply(&mut settings);
        if cli.verbose {
            settings.gateway.verbose = true;
        }

        Ok(settings)
    }
}

/// One layer of overrides on top of the file configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub local_url: Option<String>,
    pub local_model: Option<String>,
    pub remote_backend: Option<BackendType>,
    pub remote_url: Option<String>,
    pub remote_model: Option<String>,
    pub remote_key: Option<String>,
    pub max_concurrency: Option<usize>,
    pub task_timeout_secs: Option<f64>,
    pub agents_file: Option<PathBuf>,
}

impl Overrides {
    pub fn from_env(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let (_, local_url, _, local_model) = get_backend_vars_from_env(lookup, "local");
        let (remote_backend, remote_url, remote_key, remote_model) =
            get_backend_vars_from_env(lookup, "remote");

        let remote_backend = remote_backend
            .map(|b| parse_backend(&b, "BIZSYNTH_REMOTE_BACKEND"))
            .transpose()?;
        let max_concurrency = lookup("BIZSYNTH_MAX_CONCURRENCY")
            .map(|v| parse_number::<usize>(&v, "BIZSYNTH_MAX_CONCURRENCY"))
            .transpose()?;
        let task_timeout_secs = lookup("BIZSYNTH_TASK_TIMEOUT_SECS")
            .map(|v| parse_timeout(&v, "BIZSYNTH_TASK_TIMEOUT_SECS"))
            .transpose()?;
        let agents_file = lookup("BIZSYNTH_AGENTS_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            local_url,
            local_model,
            remote_backend,
            remote_url,
            remote_model,
            remote_key,
            max_concurrency,
            task_timeout_secs,
            agents_file,
        })
    }

    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let remote_backend = cli
            .remote_backend
            .as_deref()
            .map(|b| parse_backend(b, "--remote-backend"))
            .transpose()?;

        Ok(Self {
            local_url: cli.local_url.clone(),
            remote_backend,
            remote_model: cli.remote_model.clone(),
            remote_key: cli.remote_key.clone(),
            agents_file: cli.agents_file.clone(),
            ..Self::default()
        })
    }

    pub fn apply(self, settings: &mut Settings) {
        if let Some(url) = self.local_url {
            settings
                .gateway
                .local
                .get_or_insert_with(|| BackendConfig::new(BackendType::Llama))
                .api_url = Some(url);
        }
        if let Some(model) = self.local_model {
            match settings.gateway.local.as_mut() {
                Some(local) => local.model = Some(model),
                None => log::warn!("Ignoring local model '{}': no local backend URL configured", model),
            }
        }

        let touches_remote = self.remote_backend.is_some()
            || self.remote_url.is_some()
            || self.remote_model.is_some()
            || self.remote_key.is_some();
        if touches_remote {
            let remote = settings
                .gateway
                .remote
                .get_or_insert_with(|| BackendConfig::new(BackendType::Groq));
            if let Some(backend) = self.remote_backend {
                if backend != remote.backend {
                    // a URL configured for the previous provider no longer applies
                    remote.api_url = None;
                    remote.backend = backend;
                }
            }
            if let Some(url) = self.remote_url {
                remote.api_url = Some(url);
            }
            if let Some(model) = self.remote_model {
                remote.model = Some(model);
            }
            if let Some(key) = self.remote_key {
                remote.api_key = Some(key);
            }
        }

        if let Some(max) = self.max_concurrency {
            settings.orchestrator.max_concurrency = max;
        }
        if let Some(secs) = self.task_timeout_secs {
            settings.orchestrator.task_timeout = Duration::from_secs_f64(secs);
        }
        if let Some(path) = self.agents_file {
            settings.agents_file = Some(path);
        }
    }
}

fn parse_timeout(value: &str, source: &str) -> Result<f64> {
    let secs: f64 = parse_number(value, source)?;
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("{}: timeout must be a positive number of seconds", source);
    }
    Ok(secs)
}
