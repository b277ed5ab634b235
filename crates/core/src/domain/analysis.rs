use chrono::{DateTime, Utc};
use crate::domain::lenient;
use serde::{Deserialize, Deserializer, Serialize};

/// Four-tier recommendation attached to every market analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    StronglyRecommended,
    Recommended,
    ConsiderCarefully,
    NotRecommended,
}

impl Recommendation {
    /// Score bands: >=90, 70-89, 50-69, below 50.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::StronglyRecommended
        } else if score >= 70.0 {
            Self::Recommended
        } else if score >= 50.0 {
            Self::ConsiderCarefully
        } else {
            Self::NotRecommended
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "strongly-recommended" => Some(Self::StronglyRecommended),
            "recommended" => Some(Self::Recommended),
            "consider-carefully" => Some(Self::ConsiderCarefully),
            "not-recommended" => Some(Self::NotRecommended),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StronglyRecommended => "strongly-recommended",
            Self::Recommended => "recommended",
            Self::ConsiderCarefully => "consider-carefully",
            Self::NotRecommended => "not-recommended",
        }
    }
}

/// Low / Medium / High, used for regulatory risk and competition intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Level {
    Low,
    Medium,
    #[default]
    High,
}

impl Level {
    /// Prefix match, case-insensitive. Unrecognised labels read as `High`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("low") {
            Self::Low
        } else if label.starts_with("medium") || label.starts_with("moderate") {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(serde_json::Value::deserialize(d)?
            .as_str()
            .map(Level::from_label)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreBreakdown {
    #[serde(deserialize_with = "lenient::number")]
    pub legal_compliance: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub competitive_analysis: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub market_demand: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub pricing_strategy: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub cultural_adaptation: f64,
}

impl ScoreBreakdown {
    pub fn clamped(self) -> Self {
        Self {
            legal_compliance: clamp_score(self.legal_compliance),
            competitive_analysis: clamp_score(self.competitive_analysis),
            market_demand: clamp_score(self.market_demand),
            pricing_strategy: clamp_score(self.pricing_strategy),
            cultural_adaptation: clamp_score(self.cultural_adaptation),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegalCompliance {
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    pub risk_level: Level,
    #[serde(deserialize_with = "lenient::string_list")]
    pub regulations: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub certifications: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub labeling_requirements: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub prohibitions: Vec<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub compliance_timeline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Competitor {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub price_range: String,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub market_share: Option<String>,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub strengths: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompetitiveAnalysis {
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(deserialize_with = "lenient::list_of")]
    pub competitors: Vec<Competitor>,
    pub competition_intensity: Level,
    #[serde(deserialize_with = "lenient::string")]
    pub market_share_distribution: String,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub entry_barriers: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketDemand {
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(deserialize_with = "lenient::string")]
    pub market_size: String,
    #[serde(deserialize_with = "lenient::string")]
    pub growth_trend: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub consumer_preferences: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub seasonal_factors: Vec<String>,
    #[serde(
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub distribution_channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceRange {
    #[serde(deserialize_with = "lenient::number")]
    pub min: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub max: f64,
    #[serde(deserialize_with = "lenient::string")]
    pub currency: String,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub rationale: Option<String>,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: "USD".to_string(),
            rationale: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingStrategy {
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub recommended_price_range: PriceRange,
    #[serde(deserialize_with = "lenient::string")]
    pub tariff_estimate: String,
    #[serde(deserialize_with = "lenient::string")]
    pub logistics_cost: String,
    #[serde(deserialize_with = "lenient::string")]
    pub profit_margin: String,
    #[serde(
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub break_even_analysis: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CulturalAdaptation {
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    #[serde(deserialize_with = "lenient::string_list")]
    pub localization_requirements: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub cultural_considerations: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub marketing_recommendations: Vec<String>,
}

/// Analysis of one target market. Built once per (product, market) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub market: String,
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub scores: ScoreBreakdown,
    pub legal_compliance: LegalCompliance,
    pub competitive_analysis: CompetitiveAnalysis,
    pub market_demand: MarketDemand,
    pub pricing_strategy: PricingStrategy,
    pub cultural_adaptation: CulturalAdaptation,
    pub key_findings: Vec<String>,
    pub action_items: Vec<String>,
    pub risk_alerts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opportunities: Vec<String>,
    pub sources: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl MarketAnalysis {
    /// Zero-score record returned in place of a failed upstream analysis.
    pub fn fallback(market: &str, now: DateTime<Utc>) -> Self {
        Self {
            market: market.to_string(),
            overall_score: 0.0,
            recommendation: Recommendation::NotRecommended,
            scores: ScoreBreakdown::default(),
            legal_compliance: LegalCompliance {
                score: 0.0,
                risk_level: Level::High,
                regulations: vec!["Error: Unable to fetch regulatory information".to_string()],
                ..Default::default()
            },
            competitive_analysis: CompetitiveAnalysis {
                score: 0.0,
                competition_intensity: Level::High,
                market_share_distribution: "Unknown".to_string(),
                ..Default::default()
            },
            market_demand: MarketDemand {
                market_size: "Unknown".to_string(),
                growth_trend: "Unknown".to_string(),
                ..Default::default()
            },
            pricing_strategy: PricingStrategy {
                tariff_estimate: "Unknown".to_string(),
                logistics_cost: "Unknown".to_string(),
                profit_margin: "Unknown".to_string(),
                ..Default::default()
            },
            cultural_adaptation: CulturalAdaptation::default(),
            key_findings: vec![format!(
                "Analysis failed for {market}. Please try again later."
            )],
            action_items: vec!["Contact support if the issue persists.".to_string()],
            risk_alerts: vec![
                "Unable to complete market analysis due to technical error.".to_string(),
            ],
            opportunities: Vec::new(),
            sources: Vec::new(),
            last_updated: now,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.overall_score == 0.0 && self.scores == ScoreBreakdown::default()
    }
}

/// Clamp into [0, 100]; NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}
