use serde::{Deserialize, Serialize};

use crate::plan::{ExecutionType, TaskId};

/// Why an agent task did not produce output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    BackendTimeout,
    BackendUnavailable,
    BackendRateLimited,
    Configuration,
    DependencyFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendTimeout => "backend_timeout",
            Self::BackendUnavailable => "backend_unavailable",
            Self::BackendRateLimited => "backend_rate_limited",
            Self::Configuration => "configuration",
            Self::DependencyFailed => "dependency_failed",
        }
    }
}

/// Result of one attempted (or skipped) task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub task_id: TaskId,
    pub agent_id: String,
    pub output: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub tokens_used: u32,
    pub latency_ms: u64,
}

impl AgentOutput {
    pub fn success(task_id: TaskId, agent_id: String, output: String) -> Self {
        Self {
            task_id,
            agent_id,
            output,
            success: true,
            error: None,
            error_kind: None,
            tokens_used: 0,
            latency_ms: 0,
        }
    }

    pub fn failure(task_id: TaskId, agent_id: String, kind: FailureKind, error: String) -> Self {
        Self {
            task_id,
            agent_id,
            output: String::new(),
            success: false,
            error: Some(error),
            error_kind: Some(kind),
            tokens_used: 0,
            latency_ms: 0,
        }
    }

    /// Failed output for a task that never ran because an upstream task failed
    pub fn dependency_failed(task_id: TaskId, agent_id: String, failed_upstream: &[TaskId]) -> Self {
        let error = format!("skipped: upstream task(s) failed: {}", failed_upstream.join(", "));
        Self::failure(task_id, agent_id, FailureKind::DependencyFailed, error)
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_tokens(mut self, tokens_used: u32) -> Self {
        self.tokens_used = tokens_used;
        self
    }
}

/// Terminal artifact of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub text: String,
    pub source_outputs: Vec<AgentOutput>,
    pub execution_type: ExecutionType,
    /// True when the text is the canned apology rather than a model answer
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub tokens_used: u32,
}

impl SynthesisResult {
    pub fn successful_outputs(&self) -> impl Iterator<Item = &AgentOutput> {
        self.source_outputs.iter().filter(|o| o.success)
    }
}
