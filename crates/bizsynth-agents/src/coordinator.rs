use async_trait::async_trait;
use bizsynth_llm_api::{InvokeParams, ModelGateway};
use bizsynth_types::{
    AgentOutput, ErrorReport, ExecutionPlan, ExecutionType, Intent, OrchestratorError, OrchestratorState,
    ProgressEvent, RequestFailure, SynthesisResult, Task,
};
use futures::Stream;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::executor::{ExecutionObserver, Executor, NoopObserver, RequestContext};
use crate::intent::IntentParser;
use crate::planner::Planner;
use crate::registry::AgentRegistry;
use crate::synthesizer::Synthesizer;
use crate::visibility::RunTracker;

/// Capacity of the event channel used by [`Orchestrator::stream_request`]
const EVENT_BUFFER: usize = 64;

/// Facade running a request through intent parsing, planning, execution
/// and synthesis
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<AgentRegistry>,
    gateway: Arc<ModelGateway>,
    intent_parser: IntentParser,
    planner: Planner,
    executor: Executor,
    synthesizer: Synthesizer,
    plan_cache: Option<Mutex<HashMap<String, ExecutionPlan>>>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<AgentRegistry>,
        gateway: Arc<ModelGateway>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let intent_parser = IntentParser::new(
            gateway.clone(),
            InvokeParams::new(config.intent_temperature, config.intent_max_tokens),
            config.intent_timeout,
        );
        let planner = Planner::new(registry.clone());
        let executor = Executor::new(gateway.clone(), registry.clone())
            .with_max_concurrency(config.max_concurrency)
            .with_task_timeout(config.task_timeout)
            .with_failure_policy(config.failure_policy);
        let synthesizer = Synthesizer::new(
            gateway.clone(),
            InvokeParams::new(config.synthesis_temperature, config.synthesis_max_tokens),
            config.synthesis_timeout,
        )
        .with_mode(config.synthesis_mode);
        let plan_cache = config.plan_cache.then(|| Mutex::new(HashMap::new()));

        Ok(Self {
            config,
            registry,
            gateway,
            intent_parser,
            planner,
            executor,
            synthesizer,
            plan_cache,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Reject bad input before any model call
    pub fn validate_request(&self, message: &str, context: Option<&Value>) -> Result<(), OrchestratorError> {
        if message.trim().is_empty() {
            return Err(OrchestratorError::Validation("message must not be empty".to_string()));
        }
        let length = message.chars().count();
        if length > self.config.max_message_chars {
            return Err(OrchestratorError::Validation(format!(
                "message is {} characters, maximum is {}",
                length, self.config.max_message_chars
            )));
        }
        if let Some(context) = context {
            if !context.is_object() {
                return Err(OrchestratorError::Validation(
                    "context must be a JSON object".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub async fn parse_intent(&self, message: &str, context: Option<&Value>) -> Result<Intent, OrchestratorError> {
        self.intent_parser.parse(message, context).await
    }

    pub fn create_plan(&self, intent: &Intent) -> Result<ExecutionPlan, OrchestratorError> {
        let Some(cache) = &self.plan_cache else {
            return self.planner.create_plan(intent);
        };

        let key = intent.fingerprint();
        if let Some(plan) = cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            log::debug!("Plan cache hit for {}", key);
            return Ok(plan);
        }
        let plan = self.planner.create_plan(intent)?;
        if let Ok(mut cache) = cache.lock() {
            cache.insert(key, plan.clone());
        }
        Ok(plan)
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        request: &RequestContext,
        observer: &dyn ExecutionObserver,
        cancel: &CancellationToken,
    ) -> Result<Vec<AgentOutput>, OrchestratorError> {
        self.executor.execute_with(plan, request, observer, cancel).await
    }

    pub async fn synthesize(
        &self,
        outputs: &[AgentOutput],
        original_message: &str,
        execution_type: ExecutionType,
    ) -> Result<SynthesisResult, OrchestratorError> {
        self.synthesizer
            .synthesize(outputs, original_message, execution_type)
            .await
    }

    /// Run a request to completion
    pub async fn process_request(
        &self,
        message: &str,
        context: Option<Value>,
    ) -> Result<SynthesisResult, RequestFailure> {
        self.run(message, context, None, CancellationToken::new()).await
    }

    /// Run a request, sending one event per state change and per finished
    /// task. A closed receiver counts as a disconnect and cancels the run.
    pub async fn process_request_with_events(
        &self,
        message: &str,
        context: Option<Value>,
        sender: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<SynthesisResult, RequestFailure> {
        self.run(message, context, Some(sender), cancel).await
    }

    /// Progress events as a stream. Dropping the stream cancels the request.
    pub fn stream_request(
        self: Arc<Self>,
        message: String,
        context: Option<Value>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        async_stream::stream! {
            let token = cancel.child_token();
            let _guard = token.clone().drop_guard();
            let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
            let orchestrator = self.clone();
            let handle = tokio::spawn(async move {
                let _ = orchestrator
                    .process_request_with_events(&message, context, tx, token)
                    .await;
            });

            while let Some(event) = rx.recv().await {
                yield event;
            }
            let _ = handle.await;
        }
    }

    async fn run(
        &self,
        message: &str,
        context: Option<Value>,
        sender: Option<mpsc::Sender<ProgressEvent>>,
        cancel: CancellationToken,
    ) -> Result<SynthesisResult, RequestFailure> {
        let mut tracker = RunTracker::new(uuid::Uuid::new_v4().to_string());
        let cancel = cancel.child_token();
        let events = EventSink {
            sender,
            cancel: cancel.clone(),
        };

        if let Err(error) = self.validate_request(message, context.as_ref()) {
            return Err(self.fail(&mut tracker, &events, error).await);
        }
        if !self.gateway.is_configured() {
            let error = OrchestratorError::Configuration("no model backend configured".to_string());
            return Err(self.fail(&mut tracker, &events, error).await);
        }

        let request = RequestContext::new(message, context);
        let timeout_ms = self.config.request_timeout.as_millis() as u64;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
            result = tokio::time::timeout(
                self.config.request_timeout,
                self.pipeline(&mut tracker, &events, &request, &cancel),
            ) => match result {
                Ok(result) => result,
                Err(_) => Err(OrchestratorError::BackendTimeout { timeout_ms }),
            },
        };

        match outcome {
            Ok(synthesis) => {
                advance(&mut tracker, OrchestratorState::Complete);
                let metadata = tracker.snapshot();
                log::info!(
                    "[{}] complete in {} ms ({}/{} tasks succeeded)",
                    metadata.request_id,
                    metadata.elapsed_ms,
                    metadata.tasks_succeeded,
                    metadata.tasks_total
                );
                let _ = events
                    .emit(ProgressEvent::Complete {
                        synthesis: synthesis.clone(),
                        metadata,
                    })
                    .await;
                Ok(synthesis)
            }
            Err(error) => Err(self.fail(&mut tracker, &events, error).await),
        }
    }

    async fn pipeline(
        &self,
        tracker: &mut RunTracker,
        events: &EventSink,
        request: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult, OrchestratorError> {
        events.emit(ProgressEvent::AnalyzingIntent).await?;
        let intent = self.parse_intent(&request.message, request.context.as_ref()).await?;
        advance(tracker, OrchestratorState::IntentParsed);
        events
            .emit(ProgressEvent::IntentAnalyzed { intent: intent.clone() })
            .await?;

        let plan = self.create_plan(&intent)?;
        tracker.set_plan(plan.len(), plan.execution_type());
        advance(tracker, OrchestratorState::Planned);
        events.emit(ProgressEvent::PlanCreated { plan: plan.clone() }).await?;

        advance(tracker, OrchestratorState::Executing);
        events
            .emit(ProgressEvent::ExecutingAgents {
                agents: plan.agent_ids(),
            })
            .await?;

        let outputs = if events.sender.is_some() {
            self.execute(&plan, request, events, cancel).await
        } else {
            self.execute(&plan, request, &NoopObserver, cancel).await
        };
        let outputs = match outputs {
            Ok(outputs) => outputs,
            Err(error) => {
                if let OrchestratorError::PlanExhausted { outputs } = &error {
                    tracker.record_outputs(outputs);
                }
                return Err(error);
            }
        };
        tracker.record_outputs(&outputs);
        events
            .emit(ProgressEvent::ExecutionComplete {
                agent_outputs: outputs.clone(),
            })
            .await?;

        advance(tracker, OrchestratorState::Synthesizing);
        events.emit(ProgressEvent::Synthesizing).await?;
        let synthesis = self
            .synthesize(&outputs, &request.message, plan.execution_type())
            .await?;
        tracker.add_tokens(synthesis.tokens_used);
        Ok(synthesis)
    }

    async fn fail(&self, tracker: &mut RunTracker, events: &EventSink, error: OrchestratorError) -> RequestFailure {
        let from = tracker.state();
        advance(tracker, OrchestratorState::Error);
        let metadata = tracker.snapshot();
        if error.is_caller_error() {
            log::info!("[{}] rejected: {}", metadata.request_id, error);
        } else {
            log::warn!("[{}] failed in {}: {}", metadata.request_id, from, error);
        }

        let report = ErrorReport::from(&error);
        let _ = events
            .emit(ProgressEvent::Error {
                code: report.code,
                message: report.message,
                metadata: metadata.clone(),
            })
            .await;
        RequestFailure { error, metadata }
    }
}

fn advance(tracker: &mut RunTracker, next: OrchestratorState) {
    if let Err(e) = tracker.advance(next) {
        log::error!("[{}] {}", tracker.request_id(), e);
    }
}

/// Optional event channel; a send failure means the caller went away
struct EventSink {
    sender: Option<mpsc::Sender<ProgressEvent>>,
    cancel: CancellationToken,
}

impl EventSink {
    async fn emit(&self, event: ProgressEvent) -> Result<(), OrchestratorError> {
        let Some(sender) = &self.sender else {
            return Ok(());
        };
        log::debug!("event: {}", event.name());
        if sender.send(event).await.is_err() {
            self.cancel.cancel();
            return Err(OrchestratorError::Cancelled);
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionObserver for EventSink {
    async fn task_started(&self, task: &Task) {
        log::debug!("starting {} ({})", task.id, task.agent_id);
    }

    async fn task_completed(&self, output: &AgentOutput) {
        // A failed send cancels the token, which the executor observes
        let _ = self
            .emit(ProgressEvent::AgentCompleted {
                output: output.clone(),
            })
            .await;
    }
}
