use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Placeholders recognised in `prompt_template`
pub const TEMPLATE_PLACEHOLDERS: &[&str] = &[
    "{{message}}",
    "{{entities}}",
    "{{context}}",
    "{{upstream}}",
    "{{specialization}}",
];

fn default_temperature() -> f32 {
    0.5
}

fn default_max_output_tokens() -> u32 {
    1500
}

/// Agent definition loaded from the registry document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    pub specialization: String,
    pub skills: BTreeSet<String>,
    pub prompt_template: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Skills whose producers must finish before this agent runs
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on_skills: BTreeSet<String>,
    /// Used when no agent matches an intent
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl AgentDefinition {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Agent id cannot be empty".to_string());
        }

        if self.specialization.trim().is_empty() {
            return Err("Agent specialization cannot be empty".to_string());
        }

        if self.prompt_template.trim().is_empty() {
            return Err("Prompt template cannot be empty".to_string());
        }

        if self.skills.is_empty() || self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err("Agent must declare at least one non-empty skill".to_string());
        }

        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                self.temperature
            ));
        }

        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than zero".to_string());
        }

        Ok(())
    }

    /// True if any of `skills` is one of this agent's skills
    pub fn has_any_skill(&self, skills: &[&str]) -> bool {
        skills.iter().any(|s| self.skills.contains(*s))
    }

    /// True if this agent consumes something `producer` provides
    pub fn depends_on(&self, producer: &AgentDefinition) -> bool {
        self.id != producer.id && !self.depends_on_skills.is_disjoint(&producer.skills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, skills: &[&str]) -> AgentDefinition {
        AgentDefinition {
            id: id.to_string(),
            specialization: "analyst".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            prompt_template: "{{message}}".to_string(),
            temperature: 0.3,
            max_output_tokens: 500,
            depends_on_skills: BTreeSet::new(),
            fallback: false,
        }
    }

    #[test]
    fn test_valid_agent() {
        assert!(agent("market_analyst", &["market_sizing"]).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut a = agent("", &["market_sizing"]);
        assert!(a.validate().unwrap_err().contains("id"));

        a = agent("x", &[]);
        assert!(a.validate().unwrap_err().contains("skill"));

        a = agent("x", &["s"]);
        a.temperature = 2.5;
        assert!(a.validate().unwrap_err().contains("temperature"));

        a = agent("x", &["s"]);
        a.max_output_tokens = 0;
        assert!(a.validate().is_err());

        a = agent("x", &["s"]);
        a.prompt_template = "   ".to_string();
        assert!(a.validate().unwrap_err().contains("Prompt template"));
    }

    #[test]
    fn test_dependency_by_skill() {
        let market = agent("market_analyst", &["market_sizing"]);
        let mut finance = agent("financial_modeler", &["pricing"]);
        finance.depends_on_skills.insert("market_sizing".to_string());

        assert!(finance.depends_on(&market));
        assert!(!market.depends_on(&finance));
        assert!(!finance.depends_on(&finance));
    }

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let json = r#"{"id":"a","specialization":"s","skills":["x"],"prompt_template":"p"}"#;
        let a: AgentDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(a.temperature, 0.5);
        assert_eq!(a.max_output_tokens, 1500);
        assert!(!a.fallback);
        assert!(a.depends_on_skills.is_empty());
    }
}
