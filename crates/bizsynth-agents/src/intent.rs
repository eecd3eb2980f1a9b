use bizsynth_llm_api::{GatewayError, InvokeParams, ModelGateway};
use bizsynth_logging::safe_truncate;
use bizsynth_types::{Intent, IntentCategory, OrchestratorError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::prompt::{corrective_intent_prompt, extract_json_object, intent_prompt};

/// Confidence assumed when the model omits it
const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Deserialize)]
struct RawIntent {
    category: String,
    #[serde(default)]
    entities: BTreeMap<String, Value>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse a classifier reply; `None` when it is not a usable intent
pub fn parse_intent_response(text: &str) -> Option<Intent> {
    let json = extract_json_object(text)?;
    let raw: RawIntent = serde_json::from_str(json).ok()?;
    let category = IntentCategory::from_str(&raw.category)?;

    let entities = raw
        .entities
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            };
            if key.trim().is_empty() || value.is_empty() {
                None
            } else {
                Some((key.trim().to_string(), value))
            }
        })
        .collect();

    Some(Intent::new(
        category,
        entities,
        raw.confidence.unwrap_or(DEFAULT_CONFIDENCE),
    ))
}

/// Classifies a free-text request into an [`Intent`]
///
/// Classification problems never fail the request: a malformed reply is
/// retried once with a corrective instruction, and anything still unusable
/// becomes [`Intent::fallback`]. Only a missing backend is an error.
pub struct IntentParser {
    gateway: Arc<ModelGateway>,
    params: InvokeParams,
    timeout: Duration,
}

impl IntentParser {
    pub fn new(gateway: Arc<ModelGateway>, params: InvokeParams, timeout: Duration) -> Self {
        Self {
            gateway,
            params,
            timeout,
        }
    }

    pub async fn parse(&self, message: &str, context: Option<&Value>) -> Result<Intent, OrchestratorError> {
        let prompts = [intent_prompt(message, context), corrective_intent_prompt(message, context)];

        for (attempt, prompt) in prompts.iter().enumerate() {
            match self.gateway.invoke(prompt, self.params, self.timeout).await {
                Ok(completion) => {
                    if let Some(intent) = parse_intent_response(&completion.text) {
                        log::debug!(
                            "Intent parsed on attempt {}: {} ({:.2})",
                            attempt + 1,
                            intent.category,
                            intent.confidence
                        );
                        return Ok(intent);
                    }
                    log::warn!(
                        "Malformed intent reply on attempt {}: {}",
                        attempt + 1,
                        safe_truncate(&completion.text, 200)
                    );
                }
                Err(GatewayError::Configuration(msg)) => {
                    return Err(OrchestratorError::Configuration(msg));
                }
                Err(e) => {
                    log::warn!("Intent classification failed, using fallback intent: {}", e);
                    return Ok(Intent::fallback());
                }
            }
        }

        log::warn!("Intent reply unusable after retry, using fallback intent");
        Ok(Intent::fallback())
    }
}
