use anyhow::Result;
use colored::Colorize;
use serde_json::{json, Value};

use bizsynth_types::{ExecutionPlan, Intent};

use crate::app::setup::AppConfig;

/// `agents`: print the registry
pub fn list_agents(app: &AppConfig, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(app.registry.all())?);
        return Ok(());
    }

    println!("{}", format!("{} agents", app.registry.len()).bright_cyan().bold());
    for agent in app.registry.all() {
        let marker = if agent.fallback { " (fallback)".yellow().to_string() } else { String::new() };
        println!("  {}{}", agent.id.bold(), marker);
        println!("    {}", agent.specialization.bright_black());
        println!(
            "    skills: {}",
            agent.skills.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        if !agent.depends_on_skills.is_empty() {
            println!(
                "    needs:  {}",
                agent.depends_on_skills.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    }
    Ok(())
}

/// `probe`: report the configured backends and whether the local one answers
pub async fn probe_backends(app: &AppConfig, pretty: bool) -> Result<()> {
    let status = app.gateway.status().await;

    if pretty {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match &status.local {
        Some(name) => {
            let state = if status.local_available { "available".green() } else { "unavailable".red() };
            println!("local:  {} ({})", name.bold(), state);
        }
        None => println!("local:  {}", "not configured".bright_black()),
    }
    match &status.remote {
        Some(name) => println!("remote: {}", name.bold()),
        None => println!("remote: {}", "not configured".bright_black()),
    }
    if status.local.is_none() && status.remote.is_none() {
        anyhow::bail!("[CONFIGURATION_ERROR] no model backend configured");
    }
    Ok(())
}

/// `plan`: classify the request and show the plan without running any agent
pub async fn show_plan(app: &AppConfig, task: &str, context: Option<Value>, pretty: bool) -> Result<()> {
    let orchestrator = &app.orchestrator;
    let report = |e: bizsynth_types::OrchestratorError| anyhow::anyhow!("[{}] {}", e.code(), e);

    orchestrator
        .validate_request(task, context.as_ref())
        .map_err(report)?;
    let intent = orchestrator
        .parse_intent(task, context.as_ref())
        .await
        .map_err(report)?;
    let plan = orchestrator.create_plan(&intent).map_err(report)?;

    if pretty {
        println!("{}", serde_json::to_string_pretty(&plan_view(&intent, &plan))?);
    } else {
        print_plan(&intent, &plan);
    }
    Ok(())
}

fn plan_view(intent: &Intent, plan: &ExecutionPlan) -> Value {
    json!({
        "intent": intent,
        "plan": plan,
        "tiers": plan
            .tiers()
            .iter()
            .map(|tier| tier.iter().map(|t| t.id.clone()).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    })
}

fn print_plan(intent: &Intent, plan: &ExecutionPlan) {
    println!(
        "{} {} (confidence {:.2})",
        "Intent:".bright_cyan().bold(),
        intent.category.to_string().bold(),
        intent.confidence
    );
    for (key, value) in &intent.entities {
        println!("  {}: {}", key, value);
    }
    println!(
        "{} {} task(s), {}",
        "Plan:".bright_cyan().bold(),
        plan.len(),
        plan.execution_type()
    );
    for (level, tier) in plan.tiers().iter().enumerate() {
        println!("  tier {}:", level);
        for task in tier {
            if task.depends_on.is_empty() {
                println!("    {} -> {}", task.id, task.agent_id.bold());
            } else {
                let deps = task.depends_on.iter().cloned().collect::<Vec<_>>().join(", ");
                println!(
                    "    {} -> {} {}",
                    task.id,
                    task.agent_id.bold(),
                    format!("(after {})", deps).bright_black()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizsynth_types::{IntentCategory, Task};
    use std::collections::BTreeMap;

    #[test]
    fn test_plan_view_groups_tiers() {
        let plan = ExecutionPlan::new(vec![
            Task::new("task_0_market_analyst", "market_analyst"),
            Task::new("task_1_financial_modeler", "financial_modeler").with_dependency("task_0_market_analyst"),
        ])
        .unwrap();
        let intent = Intent::new(IntentCategory::FinancialModeling, BTreeMap::new(), 0.8);

        let view = plan_view(&intent, &plan);
        assert_eq!(
            view["tiers"],
            json!([["task_0_market_analyst"], ["task_1_financial_modeler"]])
        );
        assert_eq!(view["intent"]["category"], "financial_modeling");
    }
}
