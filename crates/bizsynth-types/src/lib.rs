//! Core types for bizsynth
//!
//! This crate provides the data model shared by the gateway, the agent
//! system and the CLI: intents, plans, agent outputs, synthesis results,
//! the error taxonomy and the progress events emitted while a request runs.

pub mod error;
pub mod events;
pub mod intent;
pub mod output;
pub mod plan;

pub use error::{ErrorReport, OrchestratorError, RequestFailure};
pub use events::{OrchestratorState, ProgressEvent, RunMetadata};
pub use intent::{Intent, IntentCategory};
pub use output::{AgentOutput, FailureKind, SynthesisResult};
pub use plan::{ExecutionPlan, ExecutionType, PlanError, Task, TaskId};

// ============================================================================
// Constants
// ============================================================================

/// Maximum accepted request length, in characters
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 8_000;

/// Maximum number of agent tasks in flight for one plan
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Token budget for the final synthesis call
pub const DEFAULT_SYNTHESIS_MAX_TOKENS: u32 = 4_096;

/// Token budget for the intent classification call
pub const DEFAULT_INTENT_MAX_TOKENS: u32 = 512;

/// Text returned when no agent produced usable output
pub const FALLBACK_SYNTHESIS_TEXT: &str = "We're sorry, none of the specialist analyses could be completed for this request. \
No partial results are available. Please try again later or rephrase the request.";
