use crate::config::*;
use crate::error::GatewayError;
use pretty_assertions::assert_eq;

#[test]
fn test_backend_type_aliases() {
    assert_eq!(BackendType::from_str("Groq"), Some(BackendType::Groq));
    assert_eq!(BackendType::from_str("claude"), Some(BackendType::Anthropic));
    assert_eq!(BackendType::from_str("llama.cpp"), Some(BackendType::Llama));
    assert_eq!(BackendType::from_str("llamacpp"), Some(BackendType::Llama));
    assert_eq!(BackendType::from_str("openai"), Some(BackendType::OpenAI));
    assert_eq!(BackendType::from_str("mystery"), None);
}

#[test]
fn test_parse_backend_spec_variants() {
    assert_eq!(
        parse_backend_spec("qwen@llama(http://localhost:8080)"),
        (
            "qwen".to_string(),
            Some(BackendType::Llama),
            Some("http://localhost:8080".to_string())
        )
    );
    assert_eq!(
        parse_backend_spec("gpt-4o@openai"),
        ("gpt-4o".to_string(), Some(BackendType::OpenAI), None)
    );
    assert_eq!(parse_backend_spec("plain-model"), ("plain-model".to_string(), None, None));
}

#[test]
fn test_normalize_api_url() {
    assert_eq!(
        normalize_api_url("http://localhost:8080"),
        "http://localhost:8080/v1/chat/completions"
    );
    assert_eq!(
        normalize_api_url("http://localhost:8080/"),
        "http://localhost:8080/v1/chat/completions"
    );
    assert_eq!(
        normalize_api_url("https://api.groq.com/openai/v1/chat/completions"),
        "https://api.groq.com/openai/v1/chat/completions"
    );
}

#[test]
fn test_default_urls() {
    assert_eq!(get_default_url_for_backend(&BackendType::Llama), None);
    assert_eq!(
        get_default_url_for_backend(&BackendType::Groq).as_deref(),
        Some(GROQ_API_URL)
    );
}

#[test]
fn test_gateway_config_missing_fields_use_defaults() {
    let config: GatewayConfig = config_from_json(
        r#"{"local": {"backend": "llama", "api_url": "http://127.0.0.1:8080"}}"#,
    );
    assert_eq!(config.probe_ttl_secs, DEFAULT_PROBE_TTL_SECS);
    assert_eq!(config.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT_MS);
    assert_eq!(config.local.map(|l| l.backend), Some(BackendType::Llama));
    assert!(config.remote.is_none());
}

#[test]
fn test_unknown_backend_rejected_on_deserialize() {
    let result: Result<BackendConfig, _> = serde_json::from_str(r#"{"backend": "mystery"}"#);
    assert!(result.is_err());
}

#[test]
fn test_backend_config_from_spec() {
    let config = BackendConfig::from_spec("@llama(http://localhost:9000)").unwrap();
    assert_eq!(config.backend, BackendType::Llama);
    assert_eq!(config.model, None);
    assert_eq!(config.api_url.as_deref(), Some("http://localhost:9000"));
    assert!(BackendConfig::from_spec("no-backend").is_none());
}

#[test]
fn test_llama_without_url_is_configuration_error() {
    let result = ClientFactory::create(&BackendConfig::new(BackendType::Llama), false);
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

#[test]
fn test_factory_builds_named_backends() {
    let groq = ClientFactory::create(&BackendConfig::new(BackendType::Groq).with_key("k"), false).unwrap();
    assert_eq!(groq.name(), "groq");
    let local = ClientFactory::create(
        &BackendConfig::new(BackendType::Llama).with_url("http://localhost:8080"),
        false,
    )
    .unwrap();
    assert_eq!(local.name(), "llama");
}

fn config_from_json(json: &str) -> GatewayConfig {
    serde_json::from_str(json).unwrap()
}
