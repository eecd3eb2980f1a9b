//! Prompt construction for intent classification, agent tasks and synthesis.

use bizsynth_types::{AgentOutput, IntentCategory};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::agent_config::AgentDefinition;

/// Values substituted into an agent's `prompt_template`
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub message: &'a str,
    pub entities: String,
    pub context: String,
    pub upstream: String,
}

/// Replace the known placeholders in one pass over the template.
/// Substituted values are never scanned again; unknown `{{...}}` text is left as-is.
pub fn render_template(agent: &AgentDefinition, vars: &TemplateVars<'_>) -> String {
    let template = agent.prompt_template.as_str();
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = match tail.find("}}") {
            Some(end) => match &tail[..end + 2] {
                "{{specialization}}" => Some((agent.specialization.as_str(), end + 2)),
                "{{message}}" => Some((vars.message, end + 2)),
                "{{entities}}" => Some((vars.entities.as_str(), end + 2)),
                "{{context}}" => Some((vars.context.as_str(), end + 2)),
                "{{upstream}}" => Some((vars.upstream.as_str(), end + 2)),
                _ => None,
            },
            None => None,
        };
        match value {
            Some((text, consumed)) => {
                rendered.push_str(text);
                rest = &tail[consumed..];
            }
            None => {
                rendered.push_str("{{");
                rest = &tail[2..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

pub fn format_entities(entities: &BTreeMap<String, String>) -> String {
    if entities.is_empty() {
        return "(none)".to_string();
    }
    entities
        .iter()
        .map(|(k, v)| format!("- {}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_context(context: Option<&Value>) -> String {
    match context {
        Some(Value::Object(map)) if !map.is_empty() => {
            serde_json::to_string_pretty(map).unwrap_or_else(|_| "(none)".to_string())
        }
        _ => "(none)".to_string(),
    }
}

/// Upstream section for a dependent task. Failed upstream tasks are
/// named so the agent knows what is missing.
pub fn format_upstream(outputs: &[&AgentOutput]) -> String {
    if outputs.is_empty() {
        return "(none)".to_string();
    }
    let mut section = String::new();
    for output in outputs {
        if output.success {
            section.push_str(&format!("### {} ({})\n\n{}\n\n", output.agent_id, output.task_id, output.output));
        } else {
            section.push_str(&format!(
                "### {} ({})\n\n[unavailable: {}]\n\n",
                output.agent_id,
                output.task_id,
                output.error.as_deref().unwrap_or("failed")
            ));
        }
    }
    section.trim_end().to_string()
}

pub fn intent_prompt(message: &str, context: Option<&Value>) -> String {
    let categories = IntentCategory::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Classify the following business request.\n\n\
         Categories: {categories}\n\n\
         Respond with ONLY a JSON object of this shape:\n\
         {{\"category\": \"<one of the categories>\", \"entities\": {{\"<name>\": \"<value>\"}}, \"confidence\": <0.0-1.0>}}\n\n\
         Entities are short facts from the request such as industry, region, \
         target_customer, product, budget or timeframe. Omit entities that are not mentioned.\n\n\
         Additional context:\n{context}\n\n\
         Request:\n{message}",
        categories = categories,
        context = format_context(context),
        message = message,
    )
}

pub const CORRECTIVE_INSTRUCTION: &str = "Your previous reply could not be parsed. \
Reply again with a single JSON object containing \"category\", \"entities\" and \"confidence\", \
with no markdown and no commentary.";

pub fn corrective_intent_prompt(message: &str, context: Option<&Value>) -> String {
    format!("{}\n\n{}", intent_prompt(message, context), CORRECTIVE_INSTRUCTION)
}

/// Synthesis prompt over successful outputs, already sorted by the caller
pub fn synthesis_prompt(message: &str, outputs: &[&AgentOutput]) -> String {
    let mut prompt = format!(
        "You are a lead consultant combining specialist analyses into one coherent report.\n\n\
         Original request:\n{}\n\n\
         Specialist analyses:\n\n",
        message
    );
    for output in outputs {
        prompt.push_str(&format!(
            "### Result from {} (task {})\n\n{}\n\n",
            output.agent_id, output.task_id, output.output
        ));
    }
    prompt.push_str(
        "Write a single report that answers the request directly. Start with an executive summary, \
         reconcile any conflicting figures, credit each specialist's findings, and end with \
         prioritized recommendations.",
    );
    prompt
}

/// Slice from the first `{` to the last `}`, tolerating markdown fences and chatter
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
