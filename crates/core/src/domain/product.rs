use crate::domain::lenient;
use serde::{Deserialize, Serialize};

/// Product data submitted for an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub product_name: String,
    pub category: String,
    pub description: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub cost_price: f64,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub selling_price: f64,
    pub target_markets: Vec<String>,
    pub current_market: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub production_capacity: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub certifications: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub shelf_life: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub experience: String,
}

impl ProductInput {
    /// Gross margin in percent of the selling price. Zero when nothing is sold for.
    pub fn profit_margin_pct(&self) -> f64 {
        if self.selling_price <= 0.0 {
            return 0.0;
        }
        (self.selling_price - self.cost_price) / self.selling_price * 100.0
    }

    pub fn capacity_tier(&self) -> Option<ProductionCapacity> {
        ProductionCapacity::from_label(&self.production_capacity)
    }

    pub fn experience_tier(&self) -> Option<ExportExperience> {
        ExportExperience::from_label(&self.experience)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProductionCapacity {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl ProductionCapacity {
    pub const LABELS: [&'static str; 4] = [
        "Small (< 1,000 units/month)",
        "Medium (1,000 - 10,000 units/month)",
        "Large (10,000 - 100,000 units/month)",
        "Very Large (> 100,000 units/month)",
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        // "very large" must be tested before "large".
        if label.starts_with("very large") {
            Some(Self::VeryLarge)
        } else if label.starts_with("large") {
            Some(Self::Large)
        } else if label.starts_with("medium") {
            Some(Self::Medium)
        } else if label.starts_with("small") {
            Some(Self::Small)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportExperience {
    None,
    Limited,
    Moderate,
    Extensive,
}

impl ExportExperience {
    pub const LABELS: [&'static str; 4] = [
        "No prior export experience",
        "Limited (1-2 markets)",
        "Moderate (3-5 markets)",
        "Extensive (6+ markets)",
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("no prior") || label == "none" {
            Some(Self::None)
        } else if label.starts_with("limited") {
            Some(Self::Limited)
        } else if label.starts_with("moderate") {
            Some(Self::Moderate)
        } else if label.starts_with("extensive") {
            Some(Self::Extensive)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_form_label() {
        let capacities: Vec<_> = ProductionCapacity::LABELS
            .iter()
            .map(|l| ProductionCapacity::from_label(l))
            .collect();
        assert_eq!(
            capacities,
            vec![
                Some(ProductionCapacity::Small),
                Some(ProductionCapacity::Medium),
                Some(ProductionCapacity::Large),
                Some(ProductionCapacity::VeryLarge),
            ]
        );

        let experience: Vec<_> = ExportExperience::LABELS
            .iter()
            .map(|l| ExportExperience::from_label(l))
            .collect();
        assert_eq!(
            experience,
            vec![
                Some(ExportExperience::None),
                Some(ExportExperience::Limited),
                Some(ExportExperience::Moderate),
                Some(ExportExperience::Extensive),
            ]
        );

        assert_eq!(ProductionCapacity::from_label("huge"), None);
        assert_eq!(ExportExperience::from_label(""), None);
    }

    #[test]
    fn profit_margin_handles_zero_price() {
        let mut input = ProductInput {
            cost_price: 5.0,
            selling_price: 20.0,
            ..Default::default()
        };
        assert_eq!(input.profit_margin_pct(), 75.0);

        input.selling_price = 0.0;
        assert_eq!(input.profit_margin_pct(), 0.0);
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "productName": "Tea",
            "category": "Food & Beverage",
            "description": "Green tea",
            "targetMarkets": ["Japan"],
            "currentMarket": "China",
        }))
        .unwrap();
        assert_eq!(input.cost_price, 0.0);
        assert!(input.certifications.is_empty());
        assert_eq!(input.capacity_tier(), None);
    }
}
