use serde::{Deserialize, Serialize};

pub mod factory;
pub use factory::ClientFactory;

/// Backend type for LLM models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendType {
    Groq,
    Anthropic,
    Llama,
    OpenAI,
}

impl BackendType {
    /// Parse backend type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "llama" | "llamacpp" | "llama.cpp" | "llama-cpp" => Some(Self::Llama),
            "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
            Self::Llama => "llama",
            Self::OpenAI => "openai",
        }
    }
}

impl TryFrom<String> for BackendType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BackendType::from_str(&value).ok_or_else(|| {
            format!("unknown backend '{}' (expected groq, anthropic, llama or openai)", value)
        })
    }
}

impl From<BackendType> for String {
    fn from(value: BackendType) -> Self {
        value.as_str().to_string()
    }
}

/// Default Groq API URL
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default Anthropic API URL
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Default OpenAI API URL
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model for the local llama.cpp server (the server ignores it)
pub const DEFAULT_LOCAL_MODEL: &str = "local-model";

/// Default remote model
pub const DEFAULT_REMOTE_MODEL: &str = "openai/gpt-oss-120b";

pub const DEFAULT_PROBE_TTL_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Get the default URL for a given backend type
pub fn get_default_url_for_backend(backend: &BackendType) -> Option<String> {
    match backend {
        BackendType::Anthropic => Some(ANTHROPIC_API_URL.to_string()),
        BackendType::Groq => Some(GROQ_API_URL.to_string()),
        BackendType::OpenAI => Some(OPENAI_API_URL.to_string()),
        BackendType::Llama => None, // Llama.cpp doesn't have a default URL
    }
}

/// Connection settings for one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub backend: BackendType,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl BackendConfig {
    pub fn new(backend: BackendType) -> Self {
        Self {
            backend,
            api_url: None,
            api_key: None,
            model: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build from a `model@backend(url)` spec; the backend part is required
    pub fn from_spec(spec: &str) -> Option<Self> {
        let (model, backend, api_url) = parse_backend_spec(spec);
        let backend = backend?;
        Some(Self {
            backend,
            api_url,
            api_key: None,
            model: if model.is_empty() { None } else { Some(model) },
        })
    }
}

/// Gateway wiring: which backends exist and how the local one is probed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub local: Option<BackendConfig>,
    #[serde(default)]
    pub remote: Option<BackendConfig>,
    #[serde(default = "default_probe_ttl_secs")]
    pub probe_ttl_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Dump request and response bodies to the console
    #[serde(default)]
    pub verbose: bool,
}

fn default_probe_ttl_secs() -> u64 {
    DEFAULT_PROBE_TTL_SECS
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            local: None,
            remote: None,
            probe_ttl_secs: DEFAULT_PROBE_TTL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            verbose: false,
        }
    }
}

/// Parse a backend spec in format "model@backend(api_url)", "model@backend" or "model"
/// Returns (model_name, backend, api_url)
pub fn parse_backend_spec(spec: &str) -> (String, Option<BackendType>, Option<String>) {
    let (model, rest) = match spec.split_once('@') {
        Some((model, rest)) => (model, Some(rest)),
        None => (spec, None),
    };

    let mut backend = None;
    let mut api_url = None;
    if let Some(backend_part) = rest {
        if let Some(pos) = backend_part.find('(') {
            // Format: backend(url)
            let backend_name = &backend_part[..pos];
            let url = &backend_part[pos + 1..];
            let url = url.strip_suffix(')').unwrap_or(url);
            backend = BackendType::from_str(backend_name);
            if !url.is_empty() {
                api_url = Some(url.to_string());
            }
        } else {
            backend = BackendType::from_str(backend_part);
        }
    }

    (model.to_string(), backend, api_url)
}

/// Normalize API URL by ensuring it has the correct path for OpenAI-compatible endpoints
pub fn normalize_api_url(url: &str) -> String {
    // If URL already contains a path with "completions", use it as-is
    if url.contains("/completions") || url.contains("/chat") {
        return url.to_string();
    }

    if url.ends_with('/') {
        format!("{}v1/chat/completions", url)
    } else {
        format!("{}/v1/chat/completions", url)
    }
}
