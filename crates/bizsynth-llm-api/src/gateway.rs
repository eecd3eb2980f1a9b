use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::{estimate_tokens, CompletionRequest, LlmBackend};
use crate::config::{ClientFactory, GatewayConfig};
use crate::error::GatewayError;

/// Sampling parameters for one invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvokeParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl InvokeParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Generated text plus accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
    pub latency_ms: u64,
    /// Name of the backend that produced the text
    pub backend: String,
}

/// Snapshot of the gateway wiring, used by the `probe` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub local: Option<String>,
    pub remote: Option<String>,
    pub local_available: bool,
}

#[derive(Debug, Clone, Copy)]
struct Availability {
    available: bool,
    checked_at: Instant,
}

/// Single entry point for text generation
///
/// Prefers the local backend whenever its last probe (cached for
/// `probe_ttl`) succeeded, and falls back to the remote backend when the
/// local one is down or fails with a transport error. Rate limits and
/// timeouts are surfaced as-is so callers can tell them apart.
pub struct ModelGateway {
    local: Option<Arc<dyn LlmBackend>>,
    remote: Option<Arc<dyn LlmBackend>>,
    probe_ttl: Duration,
    probe_timeout: Duration,
    availability: Mutex<Option<Availability>>,
}

impl ModelGateway {
    pub fn new(local: Option<Arc<dyn LlmBackend>>, remote: Option<Arc<dyn LlmBackend>>) -> Self {
        let defaults = GatewayConfig::default();
        Self {
            local,
            remote,
            probe_ttl: Duration::from_secs(defaults.probe_ttl_secs),
            probe_timeout: Duration::from_millis(defaults.probe_timeout_ms),
            availability: Mutex::new(None),
        }
    }

    pub fn with_probe_ttl(mut self, ttl: Duration) -> Self {
        self.probe_ttl = ttl;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Build both backends from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let local = config
            .local
            .as_ref()
            .map(|c| ClientFactory::create(c, config.verbose))
            .transpose()?;
        let remote = config
            .remote
            .as_ref()
            .map(|c| ClientFactory::create(c, config.verbose))
            .transpose()?;

        Ok(Self::new(local, remote)
            .with_probe_ttl(Duration::from_secs(config.probe_ttl_secs))
            .with_probe_timeout(Duration::from_millis(config.probe_timeout_ms)))
    }

    /// True when at least one backend is wired up
    pub fn is_configured(&self) -> bool {
        self.local.is_some() || self.remote.is_some()
    }

    /// Cached local availability. Concurrent callers with a stale cache
    /// wait on the same lock, so only one probe is in flight.
    pub async fn local_available(&self) -> bool {
        let Some(local) = &self.local else {
            return false;
        };

        let mut cache = self.availability.lock().await;
        if let Some(entry) = *cache {
            if entry.checked_at.elapsed() < self.probe_ttl {
                return entry.available;
            }
        }

        let available = tokio::time::timeout(self.probe_timeout, local.probe())
            .await
            .unwrap_or(false);
        if !available {
            log::warn!("Local backend '{}' is unavailable", local.name());
        } else {
            log::debug!("Local backend '{}' is available", local.name());
        }
        *cache = Some(Availability {
            available,
            checked_at: Instant::now(),
        });
        available
    }

    /// Force the next TTL window to treat the local backend as down
    pub async fn mark_local_unavailable(&self) {
        *self.availability.lock().await = Some(Availability {
            available: false,
            checked_at: Instant::now(),
        });
    }

    pub async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            local: self.local.as_ref().map(|b| b.name().to_string()),
            remote: self.remote.as_ref().map(|b| b.name().to_string()),
            local_available: self.local_available().await,
        }
    }

    /// Generate text for `prompt` within `timeout`
    pub async fn invoke(
        &self,
        prompt: &str,
        params: InvokeParams,
        timeout: Duration,
    ) -> Result<Completion, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::Configuration(
                "no local or remote backend configured".to_string(),
            ));
        }

        let request = CompletionRequest {
            prompt: prompt.to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        match tokio::time::timeout(timeout, self.route(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(timeout)),
        }
    }

    async fn route(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        if let Some(local) = &self.local {
            if self.local_available().await {
                match call(local.as_ref(), request).await {
                    Ok(completion) => return Ok(completion),
                    Err(GatewayError::Unavailable(msg)) if self.remote.is_some() => {
                        log::warn!("Local backend failed, falling back to remote: {}", msg);
                        self.mark_local_unavailable().await;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        match &self.remote {
            Some(remote) => call(remote.as_ref(), request).await,
            None => Err(GatewayError::Unavailable(
                "local backend is down and no remote backend is configured".to_string(),
            )),
        }
    }
}

async fn call(backend: &dyn LlmBackend, request: &CompletionRequest) -> Result<Completion, GatewayError> {
    let start = Instant::now();
    let response = backend.complete(request).await?;
    let tokens_used = match response.usage {
        Some(usage) => usage.total_tokens,
        None => estimate_tokens(&request.prompt) + estimate_tokens(&response.text),
    };

    Ok(Completion {
        text: response.text,
        tokens_used,
        latency_ms: start.elapsed().as_millis() as u64,
        backend: backend.name().to_string(),
    })
}
