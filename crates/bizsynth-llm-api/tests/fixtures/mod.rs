use serde_json::json;
use std::time::Duration;
use wiremock::matchers::*;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock server utilities for testing gateway backends
pub struct LlmMockServer {
    server: MockServer,
}

impl LlmMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// llama.cpp `/health` endpoint, expected to be hit `times` times
    pub async fn mock_health(&self, healthy: bool, times: u64) {
        let status = if healthy { 200 } else { 503 };
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "status": "ok" })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Successful OpenAI-style chat completion
    pub async fn mock_chat_success(&self, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(response_content)))
            .mount(&self.server)
            .await;
    }

    /// Chat completion that answers only after `delay`
    pub async fn mock_chat_delayed(&self, response_content: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body(response_content))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_chat_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "message": "upstream says no" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Anthropic Messages API success
    pub async fn mock_anthropic_success(&self, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_test123",
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "text", "text": response_content }],
                "stop_reason": "end_turn",
                "usage": { "input_tokens": 10, "output_tokens": 20 }
            })))
            .mount(&self.server)
            .await;
    }
}

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20 }
    })
}
