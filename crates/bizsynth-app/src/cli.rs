use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value;
use std::io;
use std::path::PathBuf;

/// CLI arguments for bizsynth
#[derive(Parser, Debug)]
#[command(name = "bizsynth")]
#[command(about = "Business analysis orchestrator - specialist agents over local and remote LLMs")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Generate shell completions
    #[arg(long, value_enum)]
    pub generate: Option<Shell>,

    /// Business request to analyze
    #[arg(long, value_name = "TEXT")]
    pub task: Option<String>,

    /// Extra context for the request, as a JSON object
    #[arg(long, value_name = "JSON")]
    pub context: Option<String>,

    /// Show progress events as they happen instead of only the final report
    #[arg(long)]
    pub stream: bool,

    /// Print the result as pretty JSON
    #[arg(long)]
    pub pretty: bool,

    /// Append every progress event to a JSONL file under ~/.bizsynth/logs
    #[arg(long)]
    pub log_run: bool,

    /// Enable verbose debug output (shows HTTP requests, responses, etc.)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Path to a TOML config file (default: ./bizsynth.toml if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Agent registry JSON file (default: the built-in registry)
    #[arg(long, value_name = "PATH")]
    pub agents_file: Option<PathBuf>,

    /// URL of the local llama.cpp server (e.g., http://localhost:8080)
    #[arg(long, value_name = "URL")]
    pub local_url: Option<String>,

    /// Backend type for the remote fallback (groq, anthropic, openai, llama)
    #[arg(long, value_name = "BACKEND")]
    pub remote_backend: Option<String>,

    /// Model name for the remote fallback
    #[arg(long, value_name = "MODEL")]
    pub remote_model: Option<String>,

    /// API key for the remote fallback
    #[arg(long, value_name = "KEY")]
    pub remote_key: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List the agents in the registry
    Agents,
    /// Report which backends are configured and whether the local one responds
    Probe,
    /// Classify a request and show the plan without running any agent
    Plan {
        /// Business request to plan
        #[arg(long, value_name = "TEXT")]
        task: String,
    },
}

impl Cli {
    /// Parsed `--context`; must be a JSON object when given
    pub fn context_value(&self) -> Result<Option<Value>> {
        let Some(raw) = self.context.as_deref() else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(raw).context("--context is not valid JSON")?;
        if !value.is_object() {
            anyhow::bail!("--context must be a JSON object");
        }
        Ok(Some(value))
    }
}

/// Write completions for `shell` to stdout
pub fn print_completions(shell: Shell) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut io::stdout());
}
