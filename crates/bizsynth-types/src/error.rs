use serde::{Deserialize, Serialize};

use crate::events::RunMetadata;
use crate::output::AgentOutput;
use crate::plan::PlanError;

/// Error taxonomy surfaced by the orchestration core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    /// Bad caller input; never an orchestration failure
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no model backend responded: {0}")]
    BackendUnavailable(String),

    #[error("model backend timed out after {timeout_ms} ms")]
    BackendTimeout { timeout_ms: u64 },

    #[error("model backend rate limited: {0}")]
    BackendRateLimited(String),

    #[error("all {} task(s) in the plan failed", .outputs.len())]
    PlanExhausted { outputs: Vec<AgentOutput> },

    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("request cancelled")]
    Cancelled,
}

impl OrchestratorError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::BackendTimeout { .. } => "BACKEND_TIMEOUT",
            Self::BackendRateLimited(_) => "BACKEND_RATE_LIMITED",
            Self::PlanExhausted { .. } => "PLAN_EXHAUSTED",
            Self::SynthesisFailed(_) => "SYNTHESIS_FAILED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::InvalidPlan(_) => "INVALID_PLAN",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Caller-side problem (4xx-equivalent) as opposed to a system failure
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Hard failure of a request together with what was measured before it
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{}] {error}", .error.code())]
pub struct RequestFailure {
    #[source]
    pub error: OrchestratorError,
    pub metadata: RunMetadata,
}

impl RequestFailure {
    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

/// Wire form of a failure, for transports and run logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&OrchestratorError> for ErrorReport {
    fn from(error: &OrchestratorError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
