use crate::domain::analysis::MarketAnalysis;
use crate::domain::contract::LlmMarketAnalysis;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```), with or
        // without a newline after the language tag.
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        let inner = match rest.rfind("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_market_analysis(
    text: &str,
    expected_market: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<MarketAnalysis> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let value = serde_json::from_str::<serde_json::Value>(&json_str)
        .with_context(|| format!("model output is not valid JSON: {json_str}"))?;
    let parsed = LlmMarketAnalysis::from_value(value)?;
    Ok(parsed.validate_and_into_analysis(expected_market, now))
}

/// Response body of either supported completion API.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompletionEnvelope {
    Chat { choices: Vec<ChatChoice> },
    Candidates { candidates: Vec<Candidate> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl CompletionEnvelope {
    /// `choices[0].message.content` or `candidates[0].content.parts[0].text`.
    pub fn text(&self) -> Option<&str> {
        let text = match self {
            Self::Chat { choices } => choices.first()?.message.as_ref()?.content.as_deref(),
            Self::Candidates { candidates } => candidates
                .first()?
                .content
                .as_ref()?
                .parts
                .first()?
                .text
                .as_deref(),
        }?;
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Level, Recommendation};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn model_output(market: &str) -> String {
        json!({
            "market": market,
            "overallScore": 81,
            "recommendation": "recommended",
            "scores": {
                "legalCompliance": 75,
                "competitiveAnalysis": 82,
                "marketDemand": 90,
                "pricingStrategy": 78,
                "culturalAdaptation": 85
            },
            "legalCompliance": {
                "score": 75,
                "riskLevel": "Medium",
                "regulations": ["FDA food facility registration"],
                "certifications": [],
                "labelingRequirements": ["English nutrition facts panel"],
                "prohibitions": []
            },
            "competitiveAnalysis": {
                "score": 82,
                "competitors": [{"name": "Twinings", "priceRange": "$5-$9"}],
                "competitionIntensity": "High",
                "marketShareDistribution": "Top 5 hold 65%"
            },
            "keyFindings": ["Demand is growing"],
            "actionItems": ["Register with FDA"],
            "riskAlerts": [],
            "sources": ["USDA"],
            "lastUpdated": "2026-02-01T11:00:00Z"
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));

        let inline = format!("```json{body}```");
        assert_eq!(extract_json(&inline), Some(body.to_string()));

        let bare_fence = format!("```\n{body}\n```");
        assert_eq!(extract_json(&bare_fence), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn fenced_and_plain_outputs_parse_identically() {
        let plain = model_output("Germany");
        let fenced = format!("```json\n{plain}\n```");
        let a = parse_market_analysis(&plain, "Germany", now()).unwrap();
        let b = parse_market_analysis(&fenced, "Germany", now()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.overall_score, 81.0);
        assert_eq!(a.recommendation, Recommendation::Recommended);
        assert_eq!(a.competitive_analysis.competitors[0].name, "Twinings");
    }

    #[test]
    fn loosely_typed_output_is_coerced() {
        let loose = json!({
            "market": "Japan",
            "overallScore": 80,
            "recommendation": null,
            "legalCompliance": {
                "score": "70",
                "riskLevel": "Medium-High",
                "regulations": "PMDA notification",
                "certifications": null,
                "complianceTimeline": 6
            },
            "competitiveAnalysis": {
                "competitors": [
                    {"name": "Ito En", "priceRange": "$4-$8", "marketShare": 25},
                    "Suntory"
                ],
                "competitionIntensity": "very high",
                "entryBarriers": null
            },
            "marketDemand": {"marketSize": 4200000000u64, "seasonalFactors": null},
            "pricingStrategy": {
                "recommendedPriceRange": {"min": "18", "max": 24, "currency": null},
                "profitMargin": 35,
                "tariffEstimate": 0.09
            },
            "culturalAdaptation": "n/a",
            "keyFindings": ["Strong tea culture", 3],
            "riskAlerts": null,
            "lastUpdated": null
        })
        .to_string();

        let analysis = parse_market_analysis(&loose, "Japan", now()).unwrap();
        assert!(!analysis.is_fallback());
        assert_eq!(analysis.overall_score, 80.0);
        assert_eq!(analysis.recommendation, Recommendation::Recommended);
        assert_eq!(analysis.legal_compliance.score, 70.0);
        assert_eq!(analysis.legal_compliance.risk_level, Level::Medium);
        assert_eq!(analysis.legal_compliance.regulations, vec!["PMDA notification"]);
        assert!(analysis.legal_compliance.certifications.is_empty());
        assert_eq!(analysis.legal_compliance.compliance_timeline.as_deref(), Some("6"));
        let competitors = &analysis.competitive_analysis.competitors;
        assert_eq!(competitors.len(), 1);
        assert_eq!(competitors[0].market_share.as_deref(), Some("25"));
        assert_eq!(analysis.competitive_analysis.competition_intensity, Level::High);
        assert_eq!(analysis.market_demand.market_size, "4200000000");
        assert_eq!(analysis.pricing_strategy.profit_margin, "35");
        assert_eq!(analysis.pricing_strategy.recommended_price_range.min, 18.0);
        assert_eq!(analysis.pricing_strategy.recommended_price_range.currency, "");
        assert_eq!(analysis.cultural_adaptation.score, 0.0);
        assert_eq!(analysis.key_findings, vec!["Strong tea culture", "3"]);
        assert!(analysis.risk_alerts.is_empty());
        assert_eq!(analysis.last_updated, now());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse_market_analysis("{\"market\": \"Japan\", ", "Japan", now()).is_err());
        assert!(parse_market_analysis("I cannot help with that.", "Japan", now()).is_err());
    }

    #[test]
    fn envelope_reads_both_response_shapes() {
        let chat: CompletionEnvelope = serde_json::from_value(json!({
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"x\":1}"}}]
        }))
        .unwrap();
        assert_eq!(chat.text(), Some("{\"x\":1}"));

        let gemini: CompletionEnvelope = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"x\":1}"}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(gemini.text(), Some("{\"x\":1}"));
    }

    #[test]
    fn envelope_without_text_yields_none() {
        let empty: CompletionEnvelope =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(empty.text(), None);

        let blank: CompletionEnvelope = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "  "}]}}]
        }))
        .unwrap();
        assert_eq!(blank.text(), None);
    }
}
