use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use bizsynth::app::{list_agents, probe_backends, run_task_mode, setup_from_cli, show_plan};
use bizsynth::cli::{print_completions, Cli, Commands};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(shell) = cli.generate {
        print_completions(shell);
        return Ok(());
    }

    let app = setup_from_cli(&cli)?;

    match &cli.command {
        Some(Commands::Agents) => list_agents(&app, cli.pretty),
        Some(Commands::Probe) => probe_backends(&app, cli.pretty).await,
        Some(Commands::Plan { task }) => show_plan(&app, task, cli.context_value()?, cli.pretty).await,
        None => match cli.task.clone() {
            Some(task_text) => run_task_mode(&cli, &app, task_text).await,
            None => {
                eprintln!(
                    "{} Nothing to do. Pass --task \"<request>\" or a subcommand (see --help).",
                    "ℹ️".cyan()
                );
                Ok(())
            }
        },
    }
}
