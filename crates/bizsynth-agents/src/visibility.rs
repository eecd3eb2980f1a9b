use bizsynth_types::{AgentOutput, ExecutionType, OrchestratorState, RunMetadata};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("illegal state transition {from} -> {to}")]
pub struct TransitionError {
    pub from: OrchestratorState,
    pub to: OrchestratorState,
}

/// Tracks one request through the orchestrator states
///
/// Time spent in each state is accumulated into
/// [`RunMetadata::phase_timings_ms`] when the state is left.
#[derive(Debug)]
pub struct RunTracker {
    state: OrchestratorState,
    metadata: RunMetadata,
    started: Instant,
    phase_started: Instant,
}

impl RunTracker {
    pub fn new(request_id: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            state: OrchestratorState::Received,
            metadata: RunMetadata::new(request_id.into()),
            started: now,
            phase_started: now,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn request_id(&self) -> &str {
        &self.metadata.request_id
    }

    /// Move to `next`, rejecting anything but the forward path or `Error`
    pub fn advance(&mut self, next: OrchestratorState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }

        let spent = self.phase_started.elapsed().as_millis() as u64;
        *self
            .metadata
            .phase_timings_ms
            .entry(self.state.as_str().to_string())
            .or_insert(0) += spent;

        log::info!(
            "[{}] {} -> {} ({} ms)",
            self.metadata.request_id,
            self.state,
            next,
            spent
        );

        self.state = next;
        self.phase_started = Instant::now();
        self.metadata.final_state = next;
        self.metadata.elapsed_ms = self.started.elapsed().as_millis() as u64;
        Ok(())
    }

    pub fn set_plan(&mut self, tasks_total: usize, execution_type: ExecutionType) {
        self.metadata.tasks_total = tasks_total;
        self.metadata.execution_type = Some(execution_type);
    }

    pub fn record_outputs(&mut self, outputs: &[AgentOutput]) {
        self.metadata.tasks_succeeded = outputs.iter().filter(|o| o.success).count();
        self.metadata.tokens_used += outputs.iter().map(|o| o.tokens_used as u64).sum::<u64>();
    }

    pub fn add_tokens(&mut self, tokens: u32) {
        self.metadata.tokens_used += tokens as u64;
    }

    /// Metadata as of now
    pub fn snapshot(&self) -> RunMetadata {
        let mut metadata = self.metadata.clone();
        metadata.elapsed_ms = self.started.elapsed().as_millis() as u64;
        metadata
    }
}
