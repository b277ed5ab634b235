use crate::domain::analysis::{
    clamp_score, CompetitiveAnalysis, CulturalAdaptation, LegalCompliance, MarketAnalysis,
    MarketDemand, PricingStrategy, Recommendation, ScoreBreakdown,
};
use crate::domain::lenient;
use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Market analysis as the model emits it. Everything beyond `market` and
/// `overallScore` is optional and normalised on the way in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmMarketAnalysis {
    pub market: String,
    pub overall_score: f64,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub recommendation: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub scores: Option<ScoreBreakdown>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub legal_compliance: LegalCompliance,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub competitive_analysis: CompetitiveAnalysis,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub market_demand: MarketDemand,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub pricing_strategy: PricingStrategy,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub cultural_adaptation: CulturalAdaptation,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_findings: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub action_items: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub risk_alerts: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub opportunities: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_updated: Option<String>,
}

impl LlmMarketAnalysis {
    /// Checks the minimal shape (non-empty `market` string, numeric
    /// `overallScore`) before decoding the rest.
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        let market = value
            .get("market")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        ensure!(
            !market.is_empty(),
            "model output is missing a non-empty `market` string"
        );
        ensure!(
            value.get("overallScore").is_some_and(Value::is_number),
            "model output is missing a numeric `overallScore`"
        );

        serde_json::from_value(value).context("model output does not match the analysis schema")
    }

    pub fn validate_and_into_analysis(
        self,
        expected_market: &str,
        now: DateTime<Utc>,
    ) -> MarketAnalysis {
        if self.market.trim() != expected_market {
            tracing::warn!(
                expected = expected_market,
                got = %self.market,
                "model answered for a different market name; keeping the requested one"
            );
        }

        let overall_score = clamp_score(self.overall_score);
        let recommendation = self
            .recommendation
            .as_deref()
            .and_then(Recommendation::from_label)
            .unwrap_or_else(|| Recommendation::from_score(overall_score));

        let mut legal_compliance = self.legal_compliance;
        let mut competitive_analysis = self.competitive_analysis;
        let mut market_demand = self.market_demand;
        let mut pricing_strategy = self.pricing_strategy;
        let mut cultural_adaptation = self.cultural_adaptation;

        let scores = self
            .scores
            .unwrap_or_else(|| ScoreBreakdown {
                legal_compliance: legal_compliance.score,
                competitive_analysis: competitive_analysis.score,
                market_demand: market_demand.score,
                pricing_strategy: pricing_strategy.score,
                cultural_adaptation: cultural_adaptation.score,
            })
            .clamped();

        legal_compliance.score = clamp_score(legal_compliance.score);
        competitive_analysis.score = clamp_score(competitive_analysis.score);
        market_demand.score = clamp_score(market_demand.score);
        pricing_strategy.score = clamp_score(pricing_strategy.score);
        cultural_adaptation.score = clamp_score(cultural_adaptation.score);

        let last_updated = self
            .last_updated
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or(now);

        MarketAnalysis {
            market: expected_market.to_string(),
            overall_score,
            recommendation,
            scores,
            legal_compliance,
            competitive_analysis,
            market_demand,
            pricing_strategy,
            cultural_adaptation,
            key_findings: self.key_findings,
            action_items: self.action_items,
            risk_alerts: self.risk_alerts,
            opportunities: self.opportunities,
            sources: self.sources,
            last_updated,
        }
    }
}
