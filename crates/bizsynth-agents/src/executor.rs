use async_trait::async_trait;
use bizsynth_llm_api::{InvokeParams, ModelGateway};
use bizsynth_types::{AgentOutput, ExecutionPlan, FailureKind, OrchestratorError, PlanError, Task, TaskId};
use futures::FutureExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::FailurePolicy;
use crate::prompt::{format_context, format_entities, format_upstream, render_template, TemplateVars};
use crate::registry::AgentRegistry;

/// The caller's request as seen by agent prompts
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub message: String,
    pub context: Option<Value>,
}

impl RequestContext {
    pub fn new(message: impl Into<String>, context: Option<Value>) -> Self {
        Self {
            message: message.into(),
            context,
        }
    }
}

/// Hook for per-task progress
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    async fn task_started(&self, _task: &Task) {}
    async fn task_completed(&self, _output: &AgentOutput) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Runs plan tasks against the gateway with bounded concurrency
pub struct Executor {
    gateway: Arc<ModelGateway>,
    registry: Arc<AgentRegistry>,
    max_concurrency: usize,
    task_timeout: Duration,
    failure_policy: FailurePolicy,
}

impl Executor {
    pub fn new(gateway: Arc<ModelGateway>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            gateway,
            registry,
            max_concurrency: bizsynth_types::DEFAULT_MAX_CONCURRENCY,
            task_timeout: Duration::from_secs(60),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        request: &RequestContext,
    ) -> Result<Vec<AgentOutput>, OrchestratorError> {
        self.execute_with(plan, request, &NoopObserver, &CancellationToken::new())
            .await
    }

    /// Run every task once and return one output per task, in completion order
    ///
    /// Fails with `PlanExhausted` when no task succeeded and with `Cancelled`
    /// when `cancel` fires; in-flight calls are aborted in both cases.
    pub async fn execute_with(
        &self,
        plan: &ExecutionPlan,
        request: &RequestContext,
        observer: &dyn ExecutionObserver,
        cancel: &CancellationToken,
    ) -> Result<Vec<AgentOutput>, OrchestratorError> {
        let mut outputs: HashMap<TaskId, AgentOutput> = HashMap::with_capacity(plan.len());
        let mut completion_order: Vec<TaskId> = Vec::with_capacity(plan.len());
        let mut started: HashSet<TaskId> = HashSet::with_capacity(plan.len());
        let mut in_flight: JoinSet<AgentOutput> = JoinSet::new();

        while outputs.len() < plan.len() {
            if cancel.is_cancelled() {
                in_flight.abort_all();
                return Err(OrchestratorError::Cancelled);
            }

            // Settle skipped tasks first, since each may unblock others
            let mut progressed = true;
            while progressed {
                progressed = false;
                for task in plan.tasks() {
                    if started.contains(&task.id) || !deps_done(task, &outputs) {
                        continue;
                    }
                    let failed = failed_deps(task, &outputs);
                    if !failed.is_empty() && self.failure_policy == FailurePolicy::SkipDependents {
                        log::warn!("Skipping {}: upstream failed ({})", task.id, failed.join(", "));
                        let output = AgentOutput::dependency_failed(task.id.clone(), task.agent_id.clone(), &failed);
                        started.insert(task.id.clone());
                        observer.task_completed(&output).await;
                        completion_order.push(task.id.clone());
                        outputs.insert(task.id.clone(), output);
                        progressed = true;
                        continue;
                    }
                    if in_flight.len() >= self.max_concurrency {
                        continue;
                    }
                    started.insert(task.id.clone());
                    observer.task_started(task).await;
                    self.spawn_task(&mut in_flight, task, request, &outputs);
                }
            }

            if outputs.len() == plan.len() {
                break;
            }
            if in_flight.is_empty() {
                // Unreachable for validated plans
                let stuck: Vec<TaskId> = plan
                    .tasks()
                    .iter()
                    .filter(|t| !started.contains(&t.id))
                    .map(|t| t.id.clone())
                    .collect();
                return Err(PlanError::Cycle(stuck).into());
            }

            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    in_flight.abort_all();
                    return Err(OrchestratorError::Cancelled);
                }
                joined = in_flight.join_next() => joined,
            };

            match joined {
                Some(Ok(output)) => {
                    if output.success {
                        log::debug!("{} completed in {} ms", output.task_id, output.latency_ms);
                    } else {
                        log::warn!(
                            "{} failed: {}",
                            output.task_id,
                            output.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    observer.task_completed(&output).await;
                    completion_order.push(output.task_id.clone());
                    outputs.insert(output.task_id.clone(), output);
                }
                Some(Err(e)) => {
                    // Task futures catch their own panics, so only aborts land here
                    log::error!("Agent task join error: {}", e);
                    return Err(OrchestratorError::Cancelled);
                }
                None => {}
            }
        }

        let ordered: Vec<AgentOutput> = completion_order
            .iter()
            .filter_map(|id| outputs.remove(id))
            .collect();

        if ordered.iter().any(|o| o.success) {
            Ok(ordered)
        } else {
            Err(OrchestratorError::PlanExhausted { outputs: ordered })
        }
    }

    fn spawn_task(
        &self,
        in_flight: &mut JoinSet<AgentOutput>,
        task: &Task,
        request: &RequestContext,
        outputs: &HashMap<TaskId, AgentOutput>,
    ) {
        let task_id = task.id.clone();
        let agent_id = task.agent_id.clone();

        let agent = match self.registry.get(&task.agent_id) {
            Ok(agent) => agent,
            Err(e) => {
                let output = AgentOutput::failure(task_id, agent_id, FailureKind::Configuration, e.to_string());
                in_flight.spawn(async move { output });
                return;
            }
        };

        let upstream: Vec<&AgentOutput> = task.depends_on.iter().filter_map(|d| outputs.get(d)).collect();
        let vars = TemplateVars {
            message: &request.message,
            entities: format_entities(&entities_of(task)),
            context: format_context(request.context.as_ref()),
            upstream: format_upstream(&upstream),
        };
        let prompt = render_template(agent, &vars);
        let params = InvokeParams::new(agent.temperature, agent.max_output_tokens);
        let gateway = self.gateway.clone();
        let timeout = self.task_timeout;

        in_flight.spawn(async move {
            let start = Instant::now();
            let result = AssertUnwindSafe(gateway.invoke(&prompt, params, timeout))
                .catch_unwind()
                .await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(Ok(completion)) => AgentOutput::success(task_id, agent_id, completion.text)
                    .with_tokens(completion.tokens_used)
                    .with_latency(latency_ms),
                Ok(Err(e)) => AgentOutput::failure(task_id, agent_id, e.failure_kind(), e.to_string())
                    .with_latency(latency_ms),
                Err(_) => AgentOutput::failure(
                    task_id,
                    agent_id,
                    FailureKind::BackendUnavailable,
                    "agent task panicked".to_string(),
                )
                .with_latency(latency_ms),
            }
        });
    }
}

fn deps_done(task: &Task, outputs: &HashMap<TaskId, AgentOutput>) -> bool {
    task.depends_on.iter().all(|d| outputs.contains_key(d))
}

fn failed_deps(task: &Task, outputs: &HashMap<TaskId, AgentOutput>) -> Vec<TaskId> {
    task.depends_on
        .iter()
        .filter(|d| outputs.get(*d).is_some_and(|o| !o.success))
        .cloned()
        .collect()
}

fn entities_of(task: &Task) -> BTreeMap<String, String> {
    match task.inputs.get("entities") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}
