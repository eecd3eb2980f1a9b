use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of analysis a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    MarketAnalysis,
    FinancialModeling,
    GoToMarket,
    CustomerProfiling,
    BusinessPlan,
    General,
}

const MARKET_SKILLS: &[&str] = &[
    "market_sizing",
    "competitive_landscape",
    "industry_trends",
    "customer_segmentation",
];
const FINANCIAL_SKILLS: &[&str] = &["financial_projection", "unit_economics", "pricing"];
const GTM_SKILLS: &[&str] = &["go_to_market", "channel_strategy", "positioning"];
const CUSTOMER_SKILLS: &[&str] = &["customer_segmentation", "persona_development", "buyer_journey"];
const BUSINESS_PLAN_SKILLS: &[&str] = &[
    "market_sizing",
    "competitive_landscape",
    "industry_trends",
    "customer_segmentation",
    "persona_development",
    "buyer_journey",
    "financial_projection",
    "unit_economics",
    "pricing",
    "go_to_market",
    "channel_strategy",
    "positioning",
];
const GENERAL_SKILLS: &[&str] = &["general_analysis"];

impl IntentCategory {
    pub const ALL: [IntentCategory; 6] = [
        IntentCategory::MarketAnalysis,
        IntentCategory::FinancialModeling,
        IntentCategory::GoToMarket,
        IntentCategory::CustomerProfiling,
        IntentCategory::BusinessPlan,
        IntentCategory::General,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketAnalysis => "market_analysis",
            Self::FinancialModeling => "financial_modeling",
            Self::GoToMarket => "go_to_market",
            Self::CustomerProfiling => "customer_profiling",
            Self::BusinessPlan => "business_plan",
            Self::General => "general",
        }
    }

    /// Parse a category label, accepting the spellings models tend to produce
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "market_analysis" | "market" | "market_research" | "market_sizing" => Some(Self::MarketAnalysis),
            "financial_modeling" | "financial_modelling" | "financial" | "finance" | "financials" => {
                Some(Self::FinancialModeling)
            }
            "go_to_market" | "gtm" | "gtm_strategy" | "go_to_market_strategy" => Some(Self::GoToMarket),
            "customer_profiling" | "customer_profile" | "customer" | "personas" => Some(Self::CustomerProfiling),
            "business_plan" | "comprehensive" | "full_analysis" => Some(Self::BusinessPlan),
            "general" | "other" | "unknown" => Some(Self::General),
            _ => None,
        }
    }

    /// Skills an agent needs (any of) to contribute to this kind of request
    pub fn required_skills(&self) -> &'static [&'static str] {
        match self {
            Self::MarketAnalysis => MARKET_SKILLS,
            Self::FinancialModeling => FINANCIAL_SKILLS,
            Self::GoToMarket => GTM_SKILLS,
            Self::CustomerProfiling => CUSTOMER_SKILLS,
            Self::BusinessPlan => BUSINESS_PLAN_SKILLS,
            Self::General => GENERAL_SKILLS,
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized interpretation of a free-text request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub category: IntentCategory,
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
    pub confidence: f32,
}

impl Intent {
    pub fn new(category: IntentCategory, entities: BTreeMap<String, String>, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            category,
            entities,
            confidence,
        }
    }

    /// Low-confidence intent used when classification did not succeed
    pub fn fallback() -> Self {
        Self::new(IntentCategory::General, BTreeMap::new(), 0.0)
    }

    pub fn is_fallback(&self) -> bool {
        self.category == IntentCategory::General && self.confidence == 0.0 && self.entities.is_empty()
    }

    /// Stable key for plan caching. Confidence is excluded because plans
    /// depend only on category and entities.
    pub fn fingerprint(&self) -> String {
        let entities = self
            .entities
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}|{}", self.category.as_str(), entities)
    }
}
