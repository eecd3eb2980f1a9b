use async_trait::async_trait;

use crate::client::{parse_openai_style, send_json, BackendResponse, CompletionRequest, LlmBackend};
use crate::error::GatewayError;

/// OpenAI-compatible chat completions client (Groq, OpenAI, other hosted APIs)
pub struct OpenAiCompatibleClient {
    name: String,
    api_key: String,
    model: String,
    api_url: String,
    client: reqwest::Client,
    verbose: bool,
}

impl OpenAiCompatibleClient {
    pub fn new(name: impl Into<String>, api_key: String, model: String, api_url: String) -> Self {
        Self {
            name: name.into(),
            api_key,
            model,
            api_url,
            client: reqwest::Client::new(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<BackendResponse, GatewayError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens
        });

        let builder = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key));

        let json = send_json(&self.name, &self.api_url, builder, &body, self.verbose).await?;
        parse_openai_style(&self.name, &json)
    }
}
