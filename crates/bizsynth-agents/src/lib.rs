//! Agent system for bizsynth
//!
//! Turns a free-text business request into an [`ExecutionPlan`] of
//! specialist agent tasks, runs them against the model gateway and merges
//! the results:
//!
//! - [`AgentRegistry`]: validated, read-only agent definitions
//! - [`IntentParser`]: request classification with graceful fallback
//! - [`Planner`]: deterministic skill-based agent selection
//! - [`Executor`]: bounded-concurrency task runner tolerant of partial failure
//! - [`Synthesizer`]: final merge of successful outputs
//! - [`Orchestrator`]: the facade tying the steps together, with progress events
//!
//! [`ExecutionPlan`]: bizsynth_types::ExecutionPlan

pub mod agent_config;
pub mod config;
pub mod coordinator;
pub mod embedded_configs;
pub mod executor;
pub mod intent;
pub mod planner;
pub mod prompt;
pub mod registry;
pub mod synthesizer;
pub mod visibility;

pub use agent_config::AgentDefinition;
pub use config::{FailurePolicy, OrchestratorConfig, SynthesisMode};
pub use coordinator::Orchestrator;
pub use executor::{ExecutionObserver, Executor, NoopObserver, RequestContext};
pub use intent::IntentParser;
pub use planner::Planner;
pub use registry::{AgentRegistry, RegistryError};
pub use synthesizer::Synthesizer;
pub use visibility::{RunTracker, TransitionError};
