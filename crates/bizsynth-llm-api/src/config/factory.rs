use std::env;
use std::sync::Arc;

use crate::client::{anthropic::AnthropicClient, llama_cpp::LlamaCppClient, openai::OpenAiCompatibleClient, LlmBackend};
use crate::config::{
    normalize_api_url, BackendConfig, BackendType, ANTHROPIC_API_URL, DEFAULT_LOCAL_MODEL, DEFAULT_REMOTE_MODEL,
    GROQ_API_URL, OPENAI_API_URL,
};
use crate::error::GatewayError;

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Client factory for creating LLM backends
pub struct ClientFactory;

impl ClientFactory {
    /// Create a backend from its configuration
    ///
    /// API keys fall back to the provider's conventional environment
    /// variable. A llama.cpp backend without a URL is a configuration error.
    pub fn create(config: &BackendConfig, verbose: bool) -> Result<Arc<dyn LlmBackend>, GatewayError> {
        match config.backend {
            BackendType::Anthropic => {
                let url = config.api_url.clone().unwrap_or_else(|| ANTHROPIC_API_URL.to_string());
                let key = config
                    .api_key
                    .clone()
                    .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
                    .or_else(|| env::var("ANTHROPIC_AUTH_TOKEN").ok())
                    .unwrap_or_default();
                let model = config.model.clone().unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());

                Ok(Arc::new(AnthropicClient::new(key, model, url).with_verbose(verbose)))
            }
            BackendType::Llama => {
                let url = config.api_url.clone().ok_or_else(|| {
                    GatewayError::Configuration("llama.cpp backend requires api_url to be specified".to_string())
                })?;
                let model = config.model.clone().unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

                Ok(Arc::new(LlamaCppClient::new(url, model).with_verbose(verbose)))
            }
            BackendType::Groq => {
                let url = config
                    .api_url
                    .as_deref()
                    .map(normalize_api_url)
                    .unwrap_or_else(|| GROQ_API_URL.to_string());
                let key = config
                    .api_key
                    .clone()
                    .or_else(|| env::var("GROQ_API_KEY").ok())
                    .unwrap_or_default();
                let model = config.model.clone().unwrap_or_else(|| DEFAULT_REMOTE_MODEL.to_string());

                Ok(Arc::new(OpenAiCompatibleClient::new("groq", key, model, url).with_verbose(verbose)))
            }
            BackendType::OpenAI => {
                let url = config
                    .api_url
                    .as_deref()
                    .map(normalize_api_url)
                    .unwrap_or_else(|| OPENAI_API_URL.to_string());
                let key = config
                    .api_key
                    .clone()
                    .or_else(|| env::var("OPENAI_API_KEY").ok())
                    .unwrap_or_default();
                let model = config.model.clone().unwrap_or_else(|| DEFAULT_REMOTE_MODEL.to_string());

                Ok(Arc::new(OpenAiCompatibleClient::new("openai", key, model, url).with_verbose(verbose)))
            }
        }
    }
}
