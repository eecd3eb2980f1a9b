use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::intent::Intent;
use crate::output::{AgentOutput, SynthesisResult};
use crate::plan::{ExecutionPlan, ExecutionType};

/// Lifecycle of one request inside the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Received,
    IntentParsed,
    Planned,
    Executing,
    Synthesizing,
    Complete,
    Error,
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::IntentParsed => "intent_parsed",
            Self::Planned => "planned",
            Self::Executing => "executing",
            Self::Synthesizing => "synthesizing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Forward-only transitions; `Error` is reachable from any live state
    pub fn can_transition_to(&self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;
        match (self, next) {
            (Complete, _) | (Error, _) => false,
            (_, Error) => true,
            (Received, IntentParsed)
            | (IntentParsed, Planned)
            | (Planned, Executing)
            | (Executing, Synthesizing)
            | (Synthesizing, Complete) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and accounting gathered while a request runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub request_id: String,
    pub elapsed_ms: u64,
    /// Milliseconds spent in each state, keyed by state name
    #[serde(default)]
    pub phase_timings_ms: BTreeMap<String, u64>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub tasks_total: usize,
    #[serde(default)]
    pub tasks_succeeded: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<ExecutionType>,
    pub final_state: OrchestratorState,
}

impl RunMetadata {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            elapsed_ms: 0,
            phase_timings_ms: BTreeMap::new(),
            tokens_used: 0,
            tasks_total: 0,
            tasks_succeeded: 0,
            execution_type: None,
            final_state: OrchestratorState::Received,
        }
    }
}

/// Progress notifications, in emission order, for one request
///
/// Serialized as `{"type": "...", "data": {...}}` so a transport can forward
/// them without knowing the payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    AnalyzingIntent,
    IntentAnalyzed {
        intent: Intent,
    },
    PlanCreated {
        plan: ExecutionPlan,
    },
    ExecutingAgents {
        agents: Vec<String>,
    },
    AgentCompleted {
        output: AgentOutput,
    },
    ExecutionComplete {
        agent_outputs: Vec<AgentOutput>,
    },
    Synthesizing,
    Complete {
        synthesis: SynthesisResult,
        metadata: RunMetadata,
    },
    Error {
        code: String,
        message: String,
        metadata: RunMetadata,
    },
}

impl ProgressEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnalyzingIntent => "analyzing_intent",
            Self::IntentAnalyzed { .. } => "intent_analyzed",
            Self::PlanCreated { .. } => "plan_created",
            Self::ExecutingAgents { .. } => "executing_agents",
            Self::AgentCompleted { .. } => "agent_completed",
            Self::ExecutionComplete { .. } => "execution_complete",
            Self::Synthesizing => "synthesizing",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
