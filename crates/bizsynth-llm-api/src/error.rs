use bizsynth_types::{FailureKind, OrchestratorError};
use std::time::Duration;

/// Failures of a single gateway invocation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// No configured backend answered (connection failure, HTTP error, unusable body)
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend call timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The provider signalled throttling (HTTP 429)
    #[error("backend rate limited: {0}")]
    RateLimited(String),

    /// Nothing to call at all; raised before any I/O
    #[error("gateway misconfigured: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unavailable(_) => FailureKind::BackendUnavailable,
            Self::Timeout(_) => FailureKind::BackendTimeout,
            Self::RateLimited(_) => FailureKind::BackendRateLimited,
            Self::Configuration(_) => FailureKind::Configuration,
        }
    }
}

impl From<GatewayError> for OrchestratorError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Unavailable(msg) => OrchestratorError::BackendUnavailable(msg),
            GatewayError::Timeout(after) => OrchestratorError::BackendTimeout {
                timeout_ms: after.as_millis() as u64,
            },
            GatewayError::RateLimited(msg) => OrchestratorError::BackendRateLimited(msg),
            GatewayError::Configuration(msg) => OrchestratorError::Configuration(msg),
        }
    }
}
