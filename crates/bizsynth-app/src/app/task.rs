use anyhow::Result;
use colored::Colorize;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use bizsynth_logging::{get_logs_dir, safe_truncate, RunLogger};
use bizsynth_types::{ErrorReport, ProgressEvent, SynthesisResult};

use crate::app::setup::AppConfig;
use crate::cli::Cli;

const PREVIEW_CHARS: usize = 160;

/// Run in task mode - process a single request and exit
pub async fn run_task_mode(cli: &Cli, app: &AppConfig, task_text: String) -> Result<()> {
    let context = cli.context_value()?;

    if !cli.pretty {
        eprintln!("{}", "📊 bizsynth - Task Mode".bright_cyan().bold());
        eprintln!("{}", format!("Task: {}", task_text).bright_yellow());
        eprintln!();
    }

    let mut run_logger = if cli.log_run {
        match open_run_logger().await {
            Ok(logger) => {
                eprintln!("{}", format!("Run log: {}", logger.path().display()).bright_black());
                Some(logger)
            }
            Err(e) => {
                eprintln!("Run logging disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let outcome = if cli.stream || run_logger.is_some() {
        run_with_events(app, &task_text, context, cli.stream, run_logger.as_mut()).await
    } else {
        app.orchestrator
            .process_request(&task_text, context)
            .await
            .map_err(|failure| ErrorReport::from(&failure.error))
    };

    if let Some(logger) = run_logger.as_mut() {
        logger.shutdown().await;
    }

    let synthesis = match outcome {
        Ok(synthesis) => synthesis,
        Err(report) => anyhow::bail!("[{}] {}", report.code, report.message),
    };

    if cli.pretty {
        println!("{}", serde_json::to_string_pretty(&pretty_result(&synthesis))?);
    } else {
        if synthesis.fallback {
            eprintln!("{}", "No specialist analysis succeeded.".yellow());
        }
        println!("{}", synthesis.text);
    }

    Ok(())
}

async fn open_run_logger() -> Result<RunLogger> {
    RunLogger::new(&get_logs_dir()?).await
}

/// Drive the request through the event stream, optionally rendering and logging each event
async fn run_with_events(
    app: &AppConfig,
    task_text: &str,
    context: Option<Value>,
    render: bool,
    mut run_logger: Option<&mut RunLogger>,
) -> Result<SynthesisResult, ErrorReport> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let stream = app
        .orchestrator
        .clone()
        .stream_request(task_text.to_string(), context, cancel);
    futures::pin_mut!(stream);

    let mut outcome = Err(ErrorReport {
        code: "CANCELLED".to_string(),
        message: "run ended without a result".to_string(),
    });
    while let Some(event) = stream.next().await {
        if let Some(logger) = run_logger.as_deref_mut() {
            logger.log(task_text, &event).await;
        }
        if render {
            eprintln!("{}", render_event(&event));
        }
        match event {
            ProgressEvent::Complete { synthesis, .. } => outcome = Ok(synthesis),
            ProgressEvent::Error { code, message, .. } => outcome = Err(ErrorReport { code, message }),
            _ => {}
        }
    }

    interrupt.abort();
    outcome
}

/// One console line per progress event
pub fn render_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::AnalyzingIntent => format!("{} Analyzing request...", "🔎".cyan()),
        ProgressEvent::IntentAnalyzed { intent } => {
            let entities = intent
                .entities
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{} Intent: {} (confidence {:.2}){}",
                "🧭".cyan(),
                intent.category.to_string().bold(),
                intent.confidence,
                if entities.is_empty() { String::new() } else { format!(" [{}]", entities) }
            )
        }
        ProgressEvent::PlanCreated { plan } => format!(
            "{} Plan: {} task(s), {}",
            "🗺️".cyan(),
            plan.len(),
            plan.execution_type()
        ),
        ProgressEvent::ExecutingAgents { agents } => {
            format!("{} Running agents: {}", "🚀".green(), agents.join(", "))
        }
        ProgressEvent::AgentCompleted { output } => {
            if output.success {
                format!(
                    "  {} {} ({} ms, {} tokens)",
                    "✓".green(),
                    output.agent_id.bold(),
                    output.latency_ms,
                    output.tokens_used
                )
            } else {
                format!(
                    "  {} {}: {}",
                    "✗".red(),
                    output.agent_id.bold(),
                    safe_truncate(output.error.as_deref().unwrap_or("failed"), PREVIEW_CHARS).red()
                )
            }
        }
        ProgressEvent::ExecutionComplete { agent_outputs } => {
            let succeeded = agent_outputs.iter().filter(|o| o.success).count();
            format!(
                "{} Agents finished: {}/{} succeeded",
                "📋".cyan(),
                succeeded,
                agent_outputs.len()
            )
        }
        ProgressEvent::Synthesizing => format!("{} Synthesizing report...", "🧩".cyan()),
        ProgressEvent::Complete { metadata, .. } => format!(
            "{} Done in {} ms, {} tokens",
            "✅".green(),
            metadata.elapsed_ms,
            metadata.tokens_used
        )
        .bright_black()
        .to_string(),
        ProgressEvent::Error { code, message, .. } => {
            format!("{} {} {}", "❌".red(), format!("[{}]", code).red().bold(), message)
        }
    }
}

fn pretty_result(synthesis: &SynthesisResult) -> Value {
    let agents: Vec<Value> = synthesis
        .source_outputs
        .iter()
        .map(|o| {
            json!({
                "task_id": o.task_id,
                "agent_id": o.agent_id,
                "success": o.success,
                "error_kind": o.error_kind.map(|k| k.as_str()),
            })
        })
        .collect();

    json!({
        "response": synthesis.text,
        "execution_type": synthesis.execution_type.as_str(),
        "fallback": synthesis.fallback,
        "tokens_used": synthesis.tokens_used,
        "agents": agents,
    })
}
