use crate::analysis::{AnalysisProvider, ProviderKind};
use crate::domain::analysis::{
    CompetitiveAnalysis, CulturalAdaptation, LegalCompliance, Level, MarketAnalysis,
    MarketDemand, PriceRange, PricingStrategy, Recommendation, ScoreBreakdown,
};
use crate::domain::product::ProductInput;
use crate::heuristic::{self, tables, HeuristicReport, FIXED_MARKET_ENTRY_COST};
use chrono::{DateTime, Utc};

/// Offline provider backed by the rule-table scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicProvider;

impl HeuristicProvider {
    pub fn analyze_at(&self, input: &ProductInput, market: &str, now: DateTime<Utc>) -> MarketAnalysis {
        let report = heuristic::score_market_at(input, market, now);
        into_market_analysis(input, report)
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for HeuristicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Heuristic
    }

    async fn analyze_market(&self, input: &ProductInput, market: &str) -> MarketAnalysis {
        let analysis = self.analyze_at(input, market, Utc::now());
        tracing::debug!(
            market,
            score = analysis.overall_score,
            recommendation = analysis.recommendation.as_str(),
            "market scored locally"
        );
        analysis
    }
}

/// High sub-score means low risk.
fn level_for(score: u32) -> Level {
    if score >= 70 {
        Level::Low
    } else if score >= 45 {
        Level::Medium
    } else {
        Level::High
    }
}

fn into_market_analysis(input: &ProductInput, report: HeuristicReport) -> MarketAnalysis {
    let market = report.market.as_str();
    let scores = &report.scores;
    let overall = f64::from(report.overall_score);
    let price = input.selling_price;

    let mut key_findings = vec![format!(
        "Local heuristic verdict for {market}: {} (overall {})",
        report.verdict.as_str(),
        report.overall_score
    )];
    key_findings.extend(report.reasons.iter().cloned());

    let mut action_items = Vec::new();
    let mut risk_alerts = Vec::new();
    if report.break_even_units.is_none() {
        action_items.push("Revisit pricing: each unit loses money after export costs.".to_string());
        risk_alerts.push("Not profitable at the current selling price.".to_string());
    }
    if scores.regulatory < 50 {
        action_items.push(format!(
            "Plan certification and labeling work before entering {market}."
        ));
        risk_alerts.push(format!("Significant regulatory hurdles in {market}."));
    }
    if scores.competition < 50 {
        risk_alerts.push(format!("Crowded competitive landscape in {market}."));
    }
    if scores.logistics < 50 {
        action_items.push("Secure a logistics partner for this route.".to_string());
    }

    let break_even_analysis = Some(match report.break_even_units {
        Some(units) => format!(
            "{units} units to recover {FIXED_MARKET_ENTRY_COST:.0} USD of market-entry costs"
        ),
        None => "Not profitable: net profit per unit is zero or negative".to_string(),
    });

    let certifications = match input.certifications.trim() {
        "" => Vec::new(),
        certs => vec![certs.to_string()],
    };
    let localization_requirements = if tables::contains(tables::HIGH_LOCALIZATION_MARKETS, market) {
        vec!["Localize packaging, labeling and marketing material".to_string()]
    } else {
        Vec::new()
    };

    MarketAnalysis {
        market: report.market.clone(),
        overall_score: overall,
        recommendation: Recommendation::from_score(overall),
        scores: ScoreBreakdown {
            legal_compliance: f64::from(scores.regulatory),
            competitive_analysis: f64::from(scores.competition),
            market_demand: f64::from(scores.market_demand),
            pricing_strategy: f64::from(scores.profitability),
            cultural_adaptation: f64::from(scores.cultural_fit),
        },
        legal_compliance: LegalCompliance {
            score: f64::from(scores.regulatory),
            risk_level: level_for(scores.regulatory),
            regulations: report.reasons.regulatory.clone(),
            certifications,
            ..Default::default()
        },
        competitive_analysis: CompetitiveAnalysis {
            score: f64::from(scores.competition),
            competition_intensity: level_for(scores.competition),
            market_share_distribution: "Not estimated".to_string(),
            ..Default::default()
        },
        market_demand: MarketDemand {
            score: f64::from(scores.market_demand),
            market_size: if tables::contains(tables::LARGE_MARKETS, market) {
                "Large".to_string()
            } else {
                "Mid-sized".to_string()
            },
            growth_trend: if tables::contains(tables::EMERGING_MARKETS, market) {
                "Emerging".to_string()
            } else {
                "Stable".to_string()
            },
            consumer_preferences: report.reasons.market_demand.clone(),
            ..Default::default()
        },
        pricing_strategy: PricingStrategy {
            score: f64::from(scores.profitability),
            recommended_price_range: PriceRange {
                min: (price * 0.85).round(),
                max: (price * 1.15).round(),
                rationale: Some("Within 15% of the current selling price".to_string()),
                ..Default::default()
            },
            tariff_estimate: format!("{:.2} per unit (shipping and duties)", report.costs.shipping_and_duties),
            logistics_cost: format!("{:.2} per unit", report.costs.total_per_unit - report.costs.manufacturing),
            profit_margin: format!("{:.1}%", report.profit_margin_pct),
            break_even_analysis,
        },
        cultural_adaptation: CulturalAdaptation {
            score: f64::from(scores.cultural_fit),
            localization_requirements,
            cultural_considerations: report.reasons.cultural_fit.clone(),
            marketing_recommendations: Vec::new(),
        },
        key_findings,
        action_items,
        risk_alerts,
        opportunities: Vec::new(),
        sources: vec!["Local heuristic rule tables".to_string()],
        last_updated: report.generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input() -> ProductInput {
        ProductInput {
            product_name: "Kimchi".to_string(),
            category: "Food & Beverage".to_string(),
            description: "Fermented cabbage".to_string(),
            cost_price: 5.0,
            selling_price: 20.0,
            target_markets: vec!["United States".to_string()],
            current_market: "South Korea".to_string(),
            production_capacity: "Small (< 1,000 units/month)".to_string(),
            experience: "No prior export experience".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn maps_sub_scores_onto_analysis_sections() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let analysis = HeuristicProvider.analyze_at(&input(), "United States", now);

        assert_eq!(analysis.market, "United States");
        assert_eq!(analysis.overall_score, 2.0);
        assert_eq!(analysis.recommendation, Recommendation::NotRecommended);
        assert_eq!(analysis.scores.pricing_strategy, 80.0);
        assert_eq!(analysis.scores.legal_compliance, 35.0);
        assert_eq!(analysis.scores.competitive_analysis, 45.0);
        assert_eq!(analysis.scores.market_demand, 85.0);
        assert_eq!(analysis.scores.cultural_adaptation, 80.0);
        assert_eq!(analysis.legal_compliance.risk_level, Level::High);
        assert_eq!(analysis.pricing_strategy.recommended_price_range.min, 17.0);
        assert_eq!(analysis.pricing_strategy.recommended_price_range.max, 23.0);
        assert_eq!(analysis.last_updated, now);
        assert!(!analysis.is_fallback());
    }

    #[test]
    fn verdict_and_break_even_are_reported() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let analysis = HeuristicProvider.analyze_at(&input(), "Germany", now);

        assert!(analysis.key_findings[0].contains("no-go"));
        assert!(analysis
            .key_findings
            .iter()
            .any(|f| f.contains("high-demand category")));
        assert_eq!(
            analysis.pricing_strategy.break_even_analysis.as_deref(),
            Some("6250 units to recover 50000 USD of market-entry costs")
        );
    }

    #[tokio::test]
    async fn serves_as_analysis_provider() {
        let provider: &dyn AnalysisProvider = &HeuristicProvider;
        assert_eq!(provider.kind(), ProviderKind::Heuristic);
        let analysis = provider.analyze_market(&input(), "Japan").await;
        assert_eq!(analysis.market, "Japan");
        assert!(analysis
            .cultural_adaptation
            .localization_requirements
            .iter()
            .any(|r| r.contains("Localize")));
    }
}
