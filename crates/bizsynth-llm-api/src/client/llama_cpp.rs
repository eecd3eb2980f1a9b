use async_trait::async_trait;
use std::time::Duration;

use crate::client::{parse_openai_style, send_json, BackendResponse, CompletionRequest, LlmBackend};
use crate::error::GatewayError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// llama.cpp server client (OpenAI-compatible API), used as the local backend
pub struct LlamaCppClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    verbose: bool,
}

impl LlamaCppClient {
    pub fn new(base_url: String, model: String) -> Self {
        // Accept either the server root or the full completions URL
        let base_url = base_url.trim_end_matches('/');
        let base_url = base_url
            .strip_suffix("/v1/chat/completions")
            .unwrap_or(base_url)
            .to_string();
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn get_health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

#[async_trait]
impl LlmBackend for LlamaCppClient {
    fn name(&self) -> &str {
        "llama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<BackendResponse, GatewayError> {
        let url = self.get_chat_completions_url();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false
        });

        let json = send_json(self.name(), &url, self.client.post(&url), &body, self.verbose).await?;
        parse_openai_style(self.name(), &json)
    }

    async fn probe(&self) -> bool {
        let result = self
            .client
            .get(self.get_health_url())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("llama.cpp probe at {} failed: {}", self.base_url, e);
                false
            }
        }
    }
}
