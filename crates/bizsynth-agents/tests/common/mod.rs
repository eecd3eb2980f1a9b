#![allow(dead_code)]

use async_trait::async_trait;
use bizsynth_agents::{AgentRegistry, Orchestrator, OrchestratorConfig};
use bizsynth_llm_api::{BackendResponse, CompletionRequest, GatewayError, LlmBackend, ModelGateway};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Prompt fragments that identify each kind of call
pub const INTENT: &str = "Classify the following business request";
pub const SYNTHESIS: &str = "lead consultant combining";
pub const MARKET: &str = "Market research analyst";
pub const FINANCE: &str = "Financial analyst building";
pub const GTM: &str = "Go-to-market strategist";
pub const CUSTOMER: &str = "Customer research specialist";
pub const GENERALIST: &str = "Senior business consultant";

pub const SAAS_REQUEST: &str = "Analyze the SaaS market for small businesses in the US";

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Error(GatewayError),
    Delayed(Duration, String),
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

/// Backend answering by prompt substring, recording every prompt it sees
pub struct ScriptedBackend {
    rules: Vec<(String, Vec<Reply>)>,
    default: Reply,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default: text("ok"),
            prompts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reply for prompts containing `pattern`; first matching rule wins
    pub fn on(mut self, pattern: &str, reply: Reply) -> Self {
        self.rules.push((pattern.to_string(), vec![reply]));
        self
    }

    /// Successive replies for repeated matches; the last one repeats
    pub fn on_sequence(mut self, pattern: &str, replies: Vec<Reply>) -> Self {
        self.rules.push((pattern.to_string(), replies));
        self
    }

    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.default = reply;
        self
    }

    /// Standard script for the SaaS market scenario
    pub fn saas() -> Self {
        Self::new()
            .on(
                INTENT,
                text(r#"{"category": "market_analysis", "entities": {"industry": "SaaS", "region": "US", "target_customer": "small businesses"}, "confidence": 0.92}"#),
            )
            .on(SYNTHESIS, text("Combined report: the US SMB SaaS market is large and the personas are price sensitive."))
            .on(MARKET, text("TAM for SMB SaaS in the US is roughly $60B."))
            .on(CUSTOMER, text("Persona: owner-operator with fewer than 20 staff."))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.prompts.lock().unwrap().iter().filter(|p| p.contains(pattern)).count()
    }

    pub fn prompt_matching(&self, pattern: &str) -> Option<String> {
        self.prompts.lock().unwrap().iter().find(|p| p.contains(pattern)).cloned()
    }

    pub fn total_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn pick(&self, prompt: &str) -> Reply {
        for (pattern, replies) in &self.rules {
            if prompt.contains(pattern.as_str()) {
                let seen = self
                    .prompts
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|p| p.contains(pattern.as_str()))
                    .count();
                // `seen` already includes the current prompt
                let index = seen.saturating_sub(1).min(replies.len() - 1);
                return replies[index].clone();
            }
        }
        self.default.clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<BackendResponse, GatewayError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let reply = self.pick(&request.prompt);
        let result = match reply {
            Reply::Text(text) => {
                // yield so concurrent tasks overlap
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(text)
            }
            Reply::Error(e) => Err(e),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result.map(|text| BackendResponse { text, usage: None })
    }
}

pub fn registry() -> Arc<AgentRegistry> {
    Arc::new(AgentRegistry::embedded().unwrap())
}

pub fn gateway(backend: &Arc<ScriptedBackend>) -> Arc<ModelGateway> {
    let backend: Arc<dyn LlmBackend> = backend.clone();
    Arc::new(ModelGateway::new(None, Some(backend)))
}

pub fn orchestrator(backend: &Arc<ScriptedBackend>, config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::new(config, registry(), gateway(backend)).unwrap()
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        task_timeout: Duration::from_secs(5),
        intent_timeout: Duration::from_secs(5),
        synthesis_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(10),
        ..OrchestratorConfig::default()
    }
}
