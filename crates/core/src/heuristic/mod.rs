//! Network-free market scoring from static rule tables.
//!
//! Six sub-scores start from a baseline and move by fixed deltas when the
//! product category or the market appears in a table, or when an input field
//! crosses a threshold. Every rule that fires leaves one reason string.

pub mod provider;
pub mod tables;

use crate::domain::product::{ExportExperience, ProductInput, ProductionCapacity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tables::contains;

/// Fixed cost of entering one market, recovered by per-unit net profit.
pub const FIXED_MARKET_ENTRY_COST: f64 = 50_000.0;

pub const SHIPPING_AND_DUTIES_RATE: f64 = 0.10;
pub const PLATFORM_FEES_RATE: f64 = 0.05;
pub const MARKETING_CAC_RATE: f64 = 0.20;

/// Category weights in percent: demand, competition, regulatory,
/// profitability, logistics, cultural fit.
const WEIGHTS_PCT: [u32; 6] = [25, 20, 15, 15, 15, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Go,
    Caution,
    NoGo,
}

impl Verdict {
    pub fn from_score(score: u32) -> Self {
        if score >= 70 {
            Self::Go
        } else if score >= 50 {
            Self::Caution
        } else {
            Self::NoGo
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Caution => "caution",
            Self::NoGo => "no-go",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicScores {
    pub market_demand: u32,
    pub competition: u32,
    pub regulatory: u32,
    pub profitability: u32,
    pub logistics: u32,
    pub cultural_fit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicReasons {
    pub market_demand: Vec<String>,
    pub competition: Vec<String>,
    pub regulatory: Vec<String>,
    pub profitability: Vec<String>,
    pub logistics: Vec<String>,
    pub cultural_fit: Vec<String>,
}

impl HeuristicReasons {
    fn counts(&self) -> [usize; 6] {
        [
            self.market_demand.len(),
            self.competition.len(),
            self.regulatory.len(),
            self.profitability.len(),
            self.logistics.len(),
            self.cultural_fit.len(),
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.market_demand
            .iter()
            .chain(&self.competition)
            .chain(&self.regulatory)
            .chain(&self.profitability)
            .chain(&self.logistics)
            .chain(&self.cultural_fit)
    }
}

/// Per-unit costs at the given selling price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub manufacturing: f64,
    pub shipping_and_duties: f64,
    pub platform_fees: f64,
    pub marketing_cac: f64,
    pub total_per_unit: f64,
    pub net_profit_per_unit: f64,
}

impl CostBreakdown {
    pub fn for_input(input: &ProductInput) -> Self {
        let price = input.selling_price;
        let manufacturing = input.cost_price;
        let shipping_and_duties = price * SHIPPING_AND_DUTIES_RATE;
        let platform_fees = price * PLATFORM_FEES_RATE;
        let marketing_cac = price * MARKETING_CAC_RATE;
        let total_per_unit = manufacturing + shipping_and_duties + platform_fees + marketing_cac;
        Self {
            manufacturing,
            shipping_and_duties,
            platform_fees,
            marketing_cac,
            total_per_unit,
            net_profit_per_unit: price - total_per_unit,
        }
    }

    /// Units needed to recover the market-entry cost; `None` when a unit
    /// makes no profit.
    pub fn break_even_units(&self) -> Option<u64> {
        if self.net_profit_per_unit > 0.0 {
            Some((FIXED_MARKET_ENTRY_COST / self.net_profit_per_unit).ceil() as u64)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicReport {
    pub market: String,
    pub overall_score: u32,
    pub verdict: Verdict,
    pub scores: HeuristicScores,
    pub reasons: HeuristicReasons,
    pub profit_margin_pct: f64,
    pub costs: CostBreakdown,
    pub break_even_units: Option<u64>,
    pub generated_at: DateTime<Utc>,
}

pub fn score_market(input: &ProductInput, market: &str) -> HeuristicReport {
    score_market_at(input, market, Utc::now())
}

pub fn score_market_at(input: &ProductInput, market: &str, now: DateTime<Utc>) -> HeuristicReport {
    let category = input.category.as_str();
    let margin = input.profit_margin_pct();

    let mut demand = Tally::new(60);
    demand.apply(
        contains(tables::HIGH_DEMAND_CATEGORIES, category),
        15,
        || format!("{category} is a high-demand category"),
    );
    demand.apply(contains(tables::LARGE_MARKETS, market), 10, || {
        format!("{market} is a large consumer market")
    });
    demand.apply(contains(tables::EMERGING_MARKETS, market), 5, || {
        format!("{market} is an emerging market with growing demand")
    });
    let (demand_score, demand_reasons) = demand.finish(0, 95);

    let mut competition = Tally::new(60);
    competition.apply(
        contains(tables::SATURATED_CATEGORIES, category),
        -20,
        || format!("{category} is a saturated category"),
    );
    competition.apply(contains(tables::COMPETITIVE_MARKETS, market), -15, || {
        format!("{market} is a highly competitive market")
    });
    competition.apply(input.description.chars().count() > 100, 10, || {
        "Detailed product description suggests clear differentiation".to_string()
    });
    let (competition_score, competition_reasons) = competition.finish(30, 100);

    let mut regulatory = Tally::new(70);
    regulatory.apply(
        contains(tables::REGULATED_CATEGORIES, category),
        -20,
        || format!("{category} products face additional regulation"),
    );
    regulatory.apply(
        contains(tables::STRICT_REGULATORY_MARKETS, market),
        -15,
        || format!("{market} has strict import regulations"),
    );
    regulatory.apply(input.certifications.chars().count() > 10, 15, || {
        "Existing certifications ease market entry".to_string()
    });
    let (regulatory_score, regulatory_reasons) = regulatory.finish(25, 95);

    let mut profitability = Tally::new(50);
    if margin > 50.0 {
        profitability.apply(true, 30, || format!("Excellent profit margin ({margin:.1}%)"));
    } else if margin > 30.0 {
        profitability.apply(true, 20, || format!("Good profit margin ({margin:.1}%)"));
    } else if margin > 15.0 {
        profitability.apply(true, 10, || format!("Moderate profit margin ({margin:.1}%)"));
    } else {
        profitability.apply(true, -10, || format!("Thin profit margin ({margin:.1}%)"));
    }
    profitability.apply(input.selling_price > 100.0, 10, || {
        "Premium price point leaves room for export costs".to_string()
    });
    let (profitability_score, profitability_reasons) = profitability.finish(0, 95);

    let capacity = input.capacity_tier();
    let mut logistics = Tally::new(60);
    logistics.apply(tables::is_near(&input.current_market, market), 15, || {
        format!("{market} is close to {}", input.current_market.trim())
    });
    logistics.apply(
        matches!(
            capacity,
            Some(ProductionCapacity::Large | ProductionCapacity::VeryLarge)
        ),
        10,
        || "Production capacity supports export volumes".to_string(),
    );
    logistics.apply(capacity == Some(ProductionCapacity::Small), -10, || {
        "Small production capacity limits export volumes".to_string()
    });
    logistics.apply(
        contains(tables::PERISHABLE_CATEGORIES, category),
        -10,
        || format!("{category} products need cold chain or fast shipping"),
    );
    let (logistics_score, logistics_reasons) = logistics.finish(20, 95);

    let mut cultural = Tally::new(65);
    cultural.apply(
        contains(tables::ENGLISH_SPEAKING_MARKETS, market),
        15,
        || format!("{market} is English-speaking"),
    );
    cultural.apply(
        contains(tables::HIGH_LOCALIZATION_MARKETS, market),
        -15,
        || format!("{market} requires extensive localization"),
    );
    cultural.apply(
        matches!(
            input.experience_tier(),
            Some(ExportExperience::Moderate | ExportExperience::Extensive)
        ),
        10,
        || "Prior export experience helps with adaptation".to_string(),
    );
    let (cultural_score, cultural_reasons) = cultural.finish(20, 95);

    let reasons = HeuristicReasons {
        market_demand: demand_reasons,
        competition: competition_reasons,
        regulatory: regulatory_reasons,
        profitability: profitability_reasons,
        logistics: logistics_reasons,
        cultural_fit: cultural_reasons,
    };
    let overall_score = weighted_reason_count(&reasons);
    let costs = CostBreakdown::for_input(input);

    HeuristicReport {
        market: market.to_string(),
        overall_score,
        verdict: Verdict::from_score(overall_score),
        scores: HeuristicScores {
            market_demand: demand_score,
            competition: competition_score,
            regulatory: regulatory_score,
            profitability: profitability_score,
            logistics: logistics_score,
            cultural_fit: cultural_score,
        },
        reasons,
        profit_margin_pct: margin,
        break_even_units: costs.break_even_units(),
        costs,
        generated_at: now,
    }
}

/// Overall score: weighted sum of reason counts, rounded half up. Sub-score
/// values do not enter it.
fn weighted_reason_count(reasons: &HeuristicReasons) -> u32 {
    let hundredths: usize = reasons
        .counts()
        .iter()
        .zip(WEIGHTS_PCT)
        .map(|(count, weight)| count * weight as usize)
        .sum();
    u32::try_from((hundredths + 50) / 100).unwrap_or(u32::MAX)
}

struct Tally {
    score: i32,
    reasons: Vec<String>,
}

impl Tally {
    fn new(baseline: i32) -> Self {
        Self {
            score: baseline,
            reasons: Vec::new(),
        }
    }

    fn apply(&mut self, fired: bool, delta: i32, reason: impl FnOnce() -> String) {
        if fired {
            self.score += delta;
            self.reasons.push(reason());
        }
    }

    fn finish(self, min: i32, max: i32) -> (u32, Vec<String>) {
        (self.score.clamp(min, max).unsigned_abs(), self.reasons)
    }
}
