use async_trait::async_trait;
use serde_json::Value;

use crate::client::{send_json, BackendResponse, CompletionRequest, LlmBackend, TokenUsage};
use crate::error::GatewayError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client using the native Messages API
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    verbose: bool,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        // Ensure base_url doesn't end with a slash
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn get_messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

/// Concatenate the text blocks of a Messages API response
fn extract_text(response: &Value) -> Option<String> {
    let blocks = response["content"].as_array()?;
    let text: String = blocks
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect();
    Some(text)
}

#[async_trait]
impl LlmBackend for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<BackendResponse, GatewayError> {
        let url = self.get_messages_url();
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{ "role": "user", "content": request.prompt }]
        });

        let builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let json = send_json(self.name(), &url, builder, &body, self.verbose).await?;

        let text = extract_text(&json)
            .ok_or_else(|| GatewayError::Unavailable("anthropic: no content in response".to_string()))?;

        let usage = json.get("usage").and_then(|u| {
            let input = u["input_tokens"].as_u64()? as u32;
            let output = u["output_tokens"].as_u64()? as u32;
            Some(TokenUsage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            })
        });

        Ok(BackendResponse { text, usage })
    }
}
