use bizsynth_types::{
    OrchestratorError, DEFAULT_INTENT_MAX_TOKENS, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_MESSAGE_CHARS,
    DEFAULT_SYNTHESIS_MAX_TOKENS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to a task whose dependency failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the dependent as failed without invoking it
    #[default]
    SkipDependents,
    /// Run the dependent anyway, noting the upstream failure in its prompt
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    /// One model call merging all successful outputs
    #[default]
    Model,
    /// Concatenate outputs under per-agent headings, no model call
    Merge,
}

/// Orchestrator tuning, read from the `[orchestrator]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_concurrency: usize,
    #[serde(rename = "task_timeout_secs", with = "duration_secs")]
    pub task_timeout: Duration,
    #[serde(rename = "intent_timeout_secs", with = "duration_secs")]
    pub intent_timeout: Duration,
    #[serde(rename = "synthesis_timeout_secs", with = "duration_secs")]
    pub synthesis_timeout: Duration,
    #[serde(rename = "request_timeout_secs", with = "duration_secs")]
    pub request_timeout: Duration,
    pub max_message_chars: usize,
    pub failure_policy: FailurePolicy,
    pub synthesis_mode: SynthesisMode,
    pub synthesis_max_tokens: u32,
    pub synthesis_temperature: f32,
    pub intent_max_tokens: u32,
    pub intent_temperature: f32,
    pub plan_cache: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            task_timeout: Duration::from_secs(60),
            intent_timeout: Duration::from_secs(20),
            synthesis_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(300),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            failure_policy: FailurePolicy::default(),
            synthesis_mode: SynthesisMode::default(),
            synthesis_max_tokens: DEFAULT_SYNTHESIS_MAX_TOKENS,
            synthesis_temperature: 0.3,
            intent_max_tokens: DEFAULT_INTENT_MAX_TOKENS,
            intent_temperature: 0.0,
            plan_cache: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.max_concurrency == 0 {
            return Err(OrchestratorError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_message_chars == 0 {
            return Err(OrchestratorError::Configuration(
                "max_message_chars must be at least 1".to_string(),
            ));
        }
        for (name, timeout) in [
            ("task_timeout_secs", self.task_timeout),
            ("intent_timeout_secs", self.intent_timeout),
            ("synthesis_timeout_secs", self.synthesis_timeout),
            ("request_timeout_secs", self.request_timeout),
        ] {
            if timeout.is_zero() {
                return Err(OrchestratorError::Configuration(format!("{} must be positive", name)));
            }
        }
        if self.synthesis_max_tokens == 0 || self.intent_max_tokens == 0 {
            return Err(OrchestratorError::Configuration(
                "token budgets must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Durations written as (possibly fractional) seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
