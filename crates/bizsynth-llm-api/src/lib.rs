//! # bizsynth-llm-api
//!
//! The Model Gateway: one `invoke` entry point in front of a local
//! (primary) text-generation backend and a remote fallback.
//!
//! - **Backends**: llama.cpp (local, OpenAI-compatible), Groq/OpenAI and
//!   Anthropic (remote), all behind the [`LlmBackend`] trait
//! - **Availability cache**: the local backend is probed at most once per
//!   TTL window, and concurrent callers share a single probe
//! - **Deadlines**: every call carries an explicit timeout that maps to
//!   [`GatewayError::Timeout`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use bizsynth_llm_api::{GatewayConfig, InvokeParams, ModelGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = ModelGateway::from_config(&GatewayConfig::default())?;
//!     let completion = gateway
//!         .invoke("Summarize the US SaaS market.", InvokeParams::new(0.3, 800), Duration::from_secs(30))
//!         .await?;
//!     println!("{} ({} tokens via {})", completion.text, completion.tokens_used, completion.backend);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;

#[cfg(test)]
mod tests;

pub use client::{BackendResponse, CompletionRequest, LlmBackend, TokenUsage};
pub use config::{
    get_default_url_for_backend, normalize_api_url, parse_backend_spec, BackendConfig, BackendType,
    ClientFactory, GatewayConfig, ANTHROPIC_API_URL, GROQ_API_URL, OPENAI_API_URL,
};
pub use error::GatewayError;
pub use gateway::{Completion, GatewayStatus, InvokeParams, ModelGateway};
