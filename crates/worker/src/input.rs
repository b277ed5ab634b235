use anyhow::Context;
use goglobal_core::domain::product::ProductInput;
use goglobal_core::validate;
use serde_json::Value;
use std::path::Path;

/// Reads a product file holding either `{"productData": {...}}` or the bare
/// product object. Non-empty `markets` replace the file's target markets.
pub fn load_product(path: &Path, markets: &[String]) -> anyhow::Result<ProductInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read product file {}", path.display()))?;
    parse_product(&text, markets).with_context(|| format!("invalid product file {}", path.display()))
}

pub fn parse_product(text: &str, markets: &[String]) -> anyhow::Result<ProductInput> {
    let value: Value = serde_json::from_str(text).context("product file is not valid JSON")?;
    let mut product = match value {
        Value::Object(mut obj) if obj.contains_key("productData") => obj
            .remove("productData")
            .unwrap_or(Value::Null),
        other => other,
    };

    if !markets.is_empty() {
        if let Value::Object(obj) = &mut product {
            obj.insert("targetMarkets".to_string(), Value::from(markets.to_vec()));
        }
    }

    Ok(validate::validate_product(&product)?)
}
