//! Static membership lists the heuristic scorer consults. Names match the
//! category and market labels offered by the product form.

pub const CATEGORIES: [&str; 11] = [
    "Electronics",
    "Food & Beverage",
    "Fashion & Apparel",
    "Beauty & Cosmetics",
    "Home & Garden",
    "Sports & Fitness",
    "Toys & Games",
    "Health & Wellness",
    "Automotive",
    "Industrial Equipment",
    "Other",
];

pub const MARKETS: [&str; 14] = [
    "United States",
    "United Kingdom",
    "Germany",
    "France",
    "Japan",
    "Australia",
    "Canada",
    "South Korea",
    "Singapore",
    "United Arab Emirates",
    "Brazil",
    "Mexico",
    "India",
    "China",
];

pub const HIGH_DEMAND_CATEGORIES: &[&str] = &[
    "Electronics",
    "Food & Beverage",
    "Beauty & Cosmetics",
    "Health & Wellness",
];

pub const SATURATED_CATEGORIES: &[&str] = &[
    "Electronics",
    "Fashion & Apparel",
    "Beauty & Cosmetics",
    "Toys & Games",
];

pub const REGULATED_CATEGORIES: &[&str] = &[
    "Food & Beverage",
    "Beauty & Cosmetics",
    "Health & Wellness",
    "Automotive",
];

pub const PERISHABLE_CATEGORIES: &[&str] = &["Food & Beverage"];

pub const LARGE_MARKETS: &[&str] = &[
    "United States",
    "China",
    "Japan",
    "Germany",
    "India",
    "United Kingdom",
];

pub const EMERGING_MARKETS: &[&str] = &["India", "Brazil", "Mexico", "United Arab Emirates"];

pub const COMPETITIVE_MARKETS: &[&str] = &[
    "United States",
    "China",
    "Japan",
    "Germany",
    "United Kingdom",
    "South Korea",
];

pub const STRICT_REGULATORY_MARKETS: &[&str] = &[
    "United States",
    "Germany",
    "France",
    "Japan",
    "Australia",
    "China",
];

pub const ENGLISH_SPEAKING_MARKETS: &[&str] = &[
    "United States",
    "United Kingdom",
    "Australia",
    "Canada",
    "Singapore",
];

pub const HIGH_LOCALIZATION_MARKETS: &[&str] =
    &["Japan", "China", "South Korea", "United Arab Emirates"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    NorthAmerica,
    LatinAmerica,
    Europe,
    AsiaPacific,
    MiddleEast,
}

/// Region of a known market or home country. Unknown names have none.
pub fn region_of(country: &str) -> Option<Region> {
    let region = match country.trim() {
        "United States" | "Canada" | "Mexico" => Region::NorthAmerica,
        "Brazil" | "Argentina" | "Chile" | "Colombia" | "Peru" => Region::LatinAmerica,
        "United Kingdom" | "Germany" | "France" | "Italy" | "Spain" | "Netherlands"
        | "Portugal" | "Poland" | "Sweden" | "Ireland" => Region::Europe,
        "Japan" | "Australia" | "South Korea" | "Singapore" | "China" | "India" | "Vietnam"
        | "Thailand" | "Indonesia" | "Malaysia" | "Philippines" | "New Zealand" | "Taiwan" => {
            Region::AsiaPacific
        }
        "United Arab Emirates" | "Saudi Arabia" | "Qatar" | "Israel" | "Turkey" => {
            Region::MiddleEast
        }
        _ => return None,
    };
    Some(region)
}

/// A target market is near when it shares a region with the home market.
pub fn is_near(current_market: &str, market: &str) -> bool {
    match (region_of(current_market), region_of(market)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub fn contains(list: &[&str], name: &str) -> bool {
    let name = name.trim();
    list.iter().any(|entry| *entry == name)
}
