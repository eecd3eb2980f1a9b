pub mod commands;
pub mod setup;
pub mod task;

pub use commands::{list_agents, probe_backends, show_plan};
pub use setup::{setup_from_cli, AppConfig};
pub use task::{render_event, run_task_mode};
