use async_trait::async_trait;
use bizsynth_logging::{log_request, log_response, safe_truncate};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::GatewayError;

pub mod anthropic;
pub mod llama_cpp;
pub mod openai;

/// One prompt-in, text-out request to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Raw backend answer before gateway accounting
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Text-generation backend - unified interface for all providers
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short name used in logs and completion metadata
    fn name(&self) -> &str;

    /// Request/response completion
    async fn complete(&self, request: &CompletionRequest) -> Result<BackendResponse, GatewayError>;

    /// Liveness check. Remote providers are assumed reachable.
    async fn probe(&self) -> bool {
        true
    }
}

/// Send a JSON request and return the parsed JSON body, mapping transport
/// and HTTP failures onto the gateway error taxonomy.
pub(crate) async fn send_json(
    backend: &str,
    url: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
    verbose: bool,
) -> Result<serde_json::Value, GatewayError> {
    log_request(backend, url, body, verbose);
    let start = Instant::now();

    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| GatewayError::Unavailable(format!("{} request to {} failed: {}", backend, url, e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| GatewayError::Unavailable(format!("{} response body unreadable: {}", backend, e)))?;
    log_response(backend, status.as_u16(), &text, start.elapsed().as_millis() as u64, verbose);

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GatewayError::RateLimited(format!(
            "{}: {}",
            backend,
            safe_truncate(&text, 200)
        )));
    }
    if !status.is_success() {
        return Err(GatewayError::Unavailable(format!(
            "{} API error {}: {}",
            backend,
            status.as_u16(),
            safe_truncate(&text, 200)
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| GatewayError::Unavailable(format!("{} returned malformed JSON: {}", backend, e)))
}

/// Rough token estimate for providers that do not report usage
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// Parse the OpenAI-style `choices[0].message.content` + `usage` shape
pub(crate) fn parse_openai_style(backend: &str, json: &serde_json::Value) -> Result<BackendResponse, GatewayError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| GatewayError::Unavailable(format!("{}: no content in response", backend)))?
        .to_string();

    let usage = json.get("usage").and_then(|u| {
        Some(TokenUsage {
            prompt_tokens: u["prompt_tokens"].as_u64()? as u32,
            completion_tokens: u["completion_tokens"].as_u64()? as u32,
            total_tokens: u["total_tokens"].as_u64()? as u32,
        })
    });

    Ok(BackendResponse { text, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abcdefghi"), 3);
    }

    #[test]
    fn test_parse_openai_style_with_usage() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
        });
        let response = parse_openai_style("test", &json).unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(5));
    }

    #[test]
    fn test_parse_openai_style_without_content() {
        let json = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_openai_style("test", &json),
            Err(GatewayError::Unavailable(_))
        ));
    }
}
