use anyhow::{Context, Result};
use bizsynth_llm_api::BackendType;
use std::str::FromStr;

/// Read the BIZSYNTH_<ROLE>_* variables for one backend role ("local" or "remote")
/// Returns (backend, url, key, model)
pub fn get_backend_vars_from_env(
    lookup: &impl Fn(&str) -> Option<String>,
    role: &str,
) -> (Option<String>, Option<String>, Option<String>, Option<String>) {
    let prefix = format!("BIZSYNTH_{}", role.to_uppercase());

    let backend = non_empty(lookup(&format!("{}_BACKEND", prefix)));
    let url = non_empty(lookup(&format!("{}_URL", prefix)));
    let key = non_empty(lookup(&format!("{}_KEY", prefix)));
    let model = non_empty(lookup(&format!("{}_MODEL", prefix)));

    (backend, url, key, model)
}

/// Parse a backend name, naming the source of the value in the error
pub fn parse_backend(value: &str, source: &str) -> Result<BackendType> {
    BackendType::from_str(value).with_context(|| {
        format!(
            "{}: unknown backend '{}' (expected groq, anthropic, openai or llama)",
            source, value
        )
    })
}

/// Parse a numeric variable, naming it in the error
pub fn parse_number<T>(value: &str, source: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("{}: '{}' is not a valid number", source, value))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
