//! bizsynth application library
//!
//! CLI definition, layered configuration (flags, `BIZSYNTH_*` environment,
//! `bizsynth.toml`) and the run modes behind the `bizsynth` binary.

pub use bizsynth_agents as agents;
pub use bizsynth_llm_api as llm_api;
pub use bizsynth_types as types;

pub mod app;
pub mod cli;
pub mod config;

pub use app::{run_task_mode, setup_from_cli, AppConfig};
pub use cli::{Cli, Commands};
pub use config::{Overrides, Settings, DEFAULT_CONFIG_FILE};
