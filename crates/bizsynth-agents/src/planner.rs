use bizsynth_types::{ExecutionPlan, Intent, OrchestratorError, PlanError, Task};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::agent_config::AgentDefinition;
use crate::registry::AgentRegistry;

/// Builds execution plans from intents. Pure: no I/O, no clock, no randomness.
#[derive(Debug, Clone)]
pub struct Planner {
    registry: Arc<AgentRegistry>,
}

impl Planner {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Agents contributing to `intent`, in registry declaration order
    pub fn select_agents(&self, intent: &Intent) -> Vec<&AgentDefinition> {
        let required = intent.category.required_skills();
        let selected: Vec<&AgentDefinition> = self
            .registry
            .all()
            .iter()
            .filter(|agent| agent.has_any_skill(required))
            .collect();

        if selected.is_empty() {
            vec![self.registry.fallback_agent()]
        } else {
            selected
        }
    }

    pub fn create_plan(&self, intent: &Intent) -> Result<ExecutionPlan, OrchestratorError> {
        let agents = self.select_agents(intent);
        let ids: Vec<String> = agents
            .iter()
            .enumerate()
            .map(|(index, agent)| task_id(index, &agent.id))
            .collect();

        let required: Vec<Value> = intent
            .category
            .required_skills()
            .iter()
            .map(|s| Value::String(s.to_string()))
            .collect();

        let mut tasks = Vec::with_capacity(agents.len());
        for (index, agent) in agents.iter().enumerate() {
            if !self.registry.contains(&agent.id) {
                return Err(PlanError::UnknownAgent {
                    task: ids[index].clone(),
                    agent: agent.id.clone(),
                }
                .into());
            }

            let mut task = Task::new(ids[index].clone(), agent.id.clone())
                .with_input("category", json!(intent.category.as_str()))
                .with_input("entities", json!(intent.entities))
                .with_input("required_skills", Value::Array(required.clone()));

            for (other_index, producer) in agents.iter().enumerate() {
                if agent.depends_on(producer) {
                    task = task.with_dependency(ids[other_index].clone());
                }
            }
            tasks.push(task);
        }

        let plan = ExecutionPlan::new(tasks)?;
        log::debug!(
            "Planned {} task(s) for {} ({}): {:?}",
            plan.len(),
            intent.category,
            plan.execution_type(),
            plan.agent_ids()
        );
        Ok(plan)
    }
}

fn task_id(index: usize, agent_id: &str) -> String {
    format!("task_{}_{}", index, agent_id)
}
