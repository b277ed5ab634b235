use crate::domain::product::ProductInput;
use serde_json::Value;
use std::fmt;

const REQUIRED_FIELDS: [&str; 5] = [
    "productName",
    "category",
    "description",
    "targetMarkets",
    "currentMarket",
];

/// Client input error. Always maps to a 400 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingProductData,
    MissingFields(Vec<&'static str>),
    EmptyTargetMarkets,
    InvalidProductData(String),
    NegativePrice(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProductData => write!(f, "Missing productData in request body"),
            Self::MissingFields(fields) => {
                write!(f, "Missing required fields: {}", fields.join(", "))
            }
            Self::EmptyTargetMarkets => write!(f, "targetMarkets must be a non-empty array"),
            Self::InvalidProductData(detail) => write!(f, "Invalid productData: {detail}"),
            Self::NegativePrice(field) => write!(f, "{field} must be a non-negative number"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates an `/api/analyze` body (`{"productData": {...}}`).
pub fn validate_request(body: &Value) -> Result<ProductInput, ValidationError> {
    let product = body
        .get("productData")
        .filter(|v| is_truthy(v))
        .ok_or(ValidationError::MissingProductData)?;
    validate_product(product)
}

/// Validates a bare product object. Checks run in order and the first
/// failing one is returned.
pub fn validate_product(product: &Value) -> Result<ProductInput, ValidationError> {
    if !product.is_object() {
        return Err(ValidationError::MissingProductData);
    }

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !product.get(*field).is_some_and(is_truthy))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    match product.get("targetMarkets") {
        Some(Value::Array(markets)) if !markets.is_empty() => {}
        _ => return Err(ValidationError::EmptyTargetMarkets),
    }

    let input: ProductInput = serde_json::from_value(product.clone())
        .map_err(|e| ValidationError::InvalidProductData(e.to_string()))?;

    if input.target_markets.iter().any(|m| m.trim().is_empty()) {
        return Err(ValidationError::InvalidProductData(
            "targetMarkets entries must be non-empty strings".to_string(),
        ));
    }
    if input.cost_price < 0.0 {
        return Err(ValidationError::NegativePrice("costPrice"));
    }
    if input.selling_price < 0.0 {
        return Err(ValidationError::NegativePrice("sellingPrice"));
    }

    Ok(input)
}

/// JavaScript truthiness, which is what the web form relies on.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
