use crate::domain::product::ProductInput;
use crate::llm::Provider;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Rubric sections in prompt order, with their declared weights.
pub const RUBRIC: [(&str, u8); 5] = [
    ("Legal & Regulatory Compliance", 30),
    ("Competitive Landscape", 25),
    ("Market Demand & Potential", 20),
    ("Pricing Strategy", 15),
    ("Cultural & Localization Fit", 10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptVariant {
    /// Short rubric, base schema.
    #[default]
    Standard,
    /// Rubric with exemplars, optional fields, scoring guidelines and a
    /// price band derived from the selling price.
    Detailed,
}

impl PromptVariant {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "terse" => Some(Self::Standard),
            "detailed" | "extended" => Some(Self::Detailed),
            _ => None,
        }
    }

    /// `configured` when it names a known variant, else the one that suits
    /// `provider` (Gemini gets the detailed prompt).
    pub fn resolve(configured: Option<&str>, provider: Provider) -> Self {
        configured
            .and_then(Self::parse)
            .unwrap_or(match provider {
                Provider::ChatCompletions => Self::Standard,
                Provider::Gemini => Self::Detailed,
            })
    }
}

pub fn build_prompt(
    input: &ProductInput,
    market: &str,
    variant: PromptVariant,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::with_capacity(8 * 1024);

    match variant {
        PromptVariant::Standard => out.push_str(
            "You are a professional international market expansion analyst. \
Produce a market entry feasibility analysis for the product below.\n\n",
        ),
        PromptVariant::Detailed => out.push_str(&format!(
            "You are a senior international trade consultant who helps businesses expand into {market}. \
Produce a detailed market entry feasibility analysis for the product below.\n\n"
        )),
    }

    out.push_str(&product_section(input, market));
    out.push_str(&rubric_section(input, market, variant));

    out.push_str("\n### Output Format\n");
    out.push_str("Respond with ONLY a valid JSON object (no markdown code fences) with exactly this structure:\n\n");
    let schema = example_schema(input, market, variant, now);
    out.push_str(&serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string()));
    out.push_str("\n\n");

    out.push_str(&rules_section());
    if variant == PromptVariant::Detailed {
        out.push_str(&scoring_guidelines());
    }
    out
}

fn product_section(input: &ProductInput, market: &str) -> String {
    let certifications = non_empty_or(&input.certifications, "None");
    let shelf_life = non_empty_or(&input.shelf_life, "N/A");
    format!(
        "### Product Information\n\
- **Product Name**: {name}\n\
- **Product Category**: {category}\n\
- **Product Description**: {description}\n\
- **Target Market**: {market}\n\
- **Cost Price**: ${cost} USD\n\
- **Target Selling Price**: ${price} USD\n\
- **Current Market**: {current}\n\
- **Production Capacity**: {capacity}\n\
- **Existing Certifications**: {certifications}\n\
- **Shelf Life**: {shelf_life}\n\
- **Export Experience**: {experience}\n\n",
        name = input.product_name,
        category = input.category,
        description = input.description,
        cost = input.cost_price,
        price = input.selling_price,
        current = input.current_market,
        capacity = input.production_capacity,
        experience = input.experience,
    )
}

fn rubric_section(input: &ProductInput, market: &str, variant: PromptVariant) -> String {
    let category = &input.category;
    let bullets: [Vec<String>; 5] = [
        vec![
            format!("Import regulations for {category} products entering {market}"),
            "Required product certifications (e.g. CE, FDA, CCC)".to_string(),
            "Labeling and packaging requirements".to_string(),
            "Prohibited or restricted items".to_string(),
            "Risk Level: Low/Medium/High".to_string(),
        ],
        vec![
            format!("Major competitors for similar products in {market} (at least 3-5)"),
            "Competitor price ranges with currency".to_string(),
            "Market share distribution and competition intensity".to_string(),
        ],
        vec![
            format!("Market size for {category} in {market}"),
            "Growth trends and forecasts".to_string(),
            "Consumer preferences and seasonal factors".to_string(),
        ],
        vec![
            "Recommended price range based on competitor pricing".to_string(),
            "Tariff and logistics cost estimates".to_string(),
            "Profit margin analysis".to_string(),
        ],
        vec![
            "Localization requirements (language, packaging, sizing)".to_string(),
            "Cultural sensitivities or taboos".to_string(),
            "Marketing recommendations".to_string(),
        ],
    ];
    let extras: [&[&str]; 5] = [
        &["Estimated compliance timeline in months"],
        &["Market entry barriers"],
        &["Key distribution channels"],
        &["Break-even analysis"],
        &["Local partnership opportunities"],
    ];

    let mut out = format!("### Analysis Requirements ({market})\n");
    for (i, ((title, weight), lines)) in RUBRIC.iter().zip(bullets).enumerate() {
        out.push_str(&format!("\n#### {}. {title} (Weight: {weight}%)\n", i + 1));
        for line in lines {
            out.push_str(&format!("- {line}\n"));
        }
        if variant == PromptVariant::Detailed {
            for line in extras[i] {
                out.push_str(&format!("- {line}\n"));
            }
        }
        out.push_str("- **Score**: 0-100\n");
    }
    out
}

fn example_schema(
    input: &ProductInput,
    market: &str,
    variant: PromptVariant,
    now: DateTime<Utc>,
) -> Value {
    let last_updated = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut schema = json!({
        "market": market,
        "overallScore": 85,
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
            "regulations": ["regulation 1", "regulation 2"],
            "certifications": ["cert 1"],
            "labelingRequirements": ["requirement 1"],
            "prohibitions": ["prohibition 1"]
        },
        "competitiveAnalysis": {
            "score": 82,
            "competitors": [
                {"name": "Competitor A", "priceRange": "$10-$20", "marketShare": "25%"}
            ],
            "competitionIntensity": "Medium",
            "marketShareDistribution": "Top 3 players control 60% of market"
        },
        "marketDemand": {
            "score": 90,
            "marketSize": "$500M annually",
            "growthTrend": "Growing at 8% YoY",
            "consumerPreferences": ["preference 1"],
            "seasonalFactors": ["factor 1"]
        },
        "pricingStrategy": {
            "score": 78,
            "recommendedPriceRange": {"min": 15, "max": 25, "currency": "USD"},
            "tariffEstimate": "10-15% import duty",
            "logisticsCost": "$2-3 per unit",
            "profitMargin": "30-40%"
        },
        "culturalAdaptation": {
            "score": 85,
            "localizationRequirements": ["requirement 1"],
            "culturalConsiderations": ["consideration 1"],
            "marketingRecommendations": ["recommendation 1"]
        },
        "keyFindings": ["Finding 1", "Finding 2", "Finding 3"],
        "actionItems": ["Action 1", "Action 2", "Action 3"],
        "riskAlerts": ["Risk 1", "Risk 2"],
        "sources": ["Source 1", "Source 2"],
        "lastUpdated": last_updated
    });

    if variant == PromptVariant::Detailed {
        let (band_min, band_max) = price_band(input.selling_price, 0.85, 1.15);
        let (retail_min, retail_max) = price_band(input.selling_price, 0.9, 1.1);
        let category = &input.category;

        schema["legalCompliance"]["complianceTimeline"] = json!("6-9 months for full certification");
        schema["competitiveAnalysis"]["competitors"][0]["strengths"] =
            json!("Strong brand recognition, wide distribution");
        schema["competitiveAnalysis"]["entryBarriers"] =
            json!("High - requires marketing investment and retail partnerships");
        schema["marketDemand"]["distributionChannels"] =
            json!(["Supermarkets (45%)", "Online retail (20%)"]);
        schema["pricingStrategy"]["recommendedPriceRange"] = json!({
            "min": band_min,
            "max": band_max,
            "currency": "USD",
            "rationale": "Positioned between mass-market and premium tiers"
        });
        schema["pricingStrategy"]["breakEvenAnalysis"] =
            json!("Approximately 15,000 units in the first year to break even");
        schema["keyFindings"] = json!([
            format!("{market} shows steady demand for {category}"),
            format!("Competitors price {category} in a range that leaves room for positioning"),
            "Certification lead time is the main schedule risk"
        ]);
        schema["actionItems"] = json!([
            "PRIORITY: start the certification process immediately",
            format!("Recommended retail price: ${retail_min}-${retail_max}"),
            "Budget $50,000-$75,000 for initial market entry costs"
        ]);
        schema["opportunities"] = json!([
            "Opportunity 1",
            "Opportunity 2"
        ]);
    }

    schema
}

fn rules_section() -> String {
    [
        "### Rules",
        "1. Cite sources for data; reference regulations by official number where possible.",
        "2. Always state the currency for monetary values.",
        "3. If information is unavailable, say so and suggest an alternative.",
        "4. The JSON must be valid: double quotes, no comments, no trailing commas.",
        "5. Map overallScore to recommendation exactly:",
        "   - \"strongly-recommended\" = 90-100",
        "   - \"recommended\" = 70-89",
        "   - \"consider-carefully\" = 50-69",
        "   - \"not-recommended\" = below 50",
        "",
    ]
    .join("\n")
}

fn scoring_guidelines() -> String {
    [
        "",
        "### Scoring Guidelines",
        "- Legal: 90-100 minimal barriers; 70-89 standard certifications; 50-69 significant hurdles; 0-49 prohibited or restricted.",
        "- Competition: 90-100 low competition; 70-89 clear positioning exists; 50-69 differentiation challenging; 0-49 saturated.",
        "- Demand: 90-100 large and growing; 70-89 good size, stable; 50-69 limited or slow; 0-49 small or declining.",
        "- Pricing: 90-100 excellent margins; 70-89 good margins; 50-69 thin margins; 0-49 unprofitable.",
        "- Cultural: 90-100 minimal adaptation; 70-89 manageable localization; 50-69 significant adaptation; 0-49 major barriers.",
        "",
    ]
    .join("\n")
}

fn price_band(price: f64, low: f64, high: f64) -> (i64, i64) {
    ((price * low).round() as i64, (price * high).round() as i64)
}

fn non_empty_or<'a>(s: &'a str, default: &'a str) -> &'a str {
    if s.trim().is_empty() {
        default
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input() -> ProductInput {
        ProductInput {
            product_name: "Jasmine Tea".to_string(),
            category: "Food & Beverage".to_string(),
            description: "Hand-rolled jasmine green tea".to_string(),
            cost_price: 5.0,
            selling_price: 20.0,
            target_markets: vec!["Germany".to_string()],
            current_market: "China".to_string(),
            production_capacity: "Small (< 1,000 units/month)".to_string(),
            certifications: String::new(),
            shelf_life: String::new(),
            experience: "No prior export experience".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn interpolates_every_input_field() {
        let prompt = build_prompt(&input(), "Germany", PromptVariant::Standard, now());
        for needle in [
            "Jasmine Tea",
            "Food & Beverage",
            "Hand-rolled jasmine green tea",
            "**Target Market**: Germany",
            "$5 USD",
            "$20 USD",
            "**Current Market**: China",
            "Small (< 1,000 units/month)",
            "**Existing Certifications**: None",
            "**Shelf Life**: N/A",
            "No prior export experience",
        ] {
            assert!(prompt.contains(needle), "prompt is missing {needle:?}");
        }
    }

    #[test]
    fn declares_rubric_weights_and_bands() {
        let prompt = build_prompt(&input(), "Germany", PromptVariant::Standard, now());
        for (title, weight) in RUBRIC {
            assert!(prompt.contains(&format!("{title} (Weight: {weight}%)")));
        }
        assert!(prompt.contains("\"strongly-recommended\" = 90-100"));
        assert!(prompt.contains("\"not-recommended\" = below 50"));
        assert!(prompt.contains("\"market\": \"Germany\""));
        assert!(prompt.contains("2026-02-01T12:00:00.000Z"));
        assert!(!prompt.contains("opportunities"));
    }

    #[test]
    fn detailed_variant_adds_price_band_and_optional_fields() {
        let prompt = build_prompt(&input(), "Germany", PromptVariant::Detailed, now());
        // 20 * 0.85 = 17, 20 * 1.15 = 23
        assert!(prompt.contains("\"min\": 17"));
        assert!(prompt.contains("\"max\": 23"));
        assert!(prompt.contains("$18-$22"));
        assert!(prompt.contains("\"opportunities\""));
        assert!(prompt.contains("\"breakEvenAnalysis\""));
        assert!(prompt.contains("Scoring Guidelines"));
    }

    #[test]
    fn embedded_schema_is_valid_json() {
        let prompt = build_prompt(&input(), "Japan", PromptVariant::Detailed, now());
        let start = prompt.find('{').unwrap();
        let end = prompt.rfind('}').unwrap();
        let schema: Value = serde_json::from_str(&prompt[start..=end]).unwrap();
        assert_eq!(schema["market"], "Japan");
    }

    #[test]
    fn parses_variant_names() {
        assert_eq!(PromptVariant::parse("Detailed"), Some(PromptVariant::Detailed));
        assert_eq!(PromptVariant::parse("terse"), Some(PromptVariant::Standard));
        assert_eq!(PromptVariant::parse("verbose"), None);
    }

    #[test]
    fn configured_variant_overrides_the_provider_default() {
        assert_eq!(
            PromptVariant::resolve(None, Provider::Gemini),
            PromptVariant::Detailed
        );
        assert_eq!(
            PromptVariant::resolve(Some("standard"), Provider::Gemini),
            PromptVariant::Standard
        );
        assert_eq!(
            PromptVariant::resolve(Some("unknown"), Provider::ChatCompletions),
            PromptVariant::Standard
        );
    }
}
