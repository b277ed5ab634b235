use crate::analysis::{AnalysisProvider, ProviderKind};
use crate::config::Settings;
use crate::domain::analysis::MarketAnalysis;
use crate::domain::product::ProductInput;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::prompt::{self, PromptVariant};
use crate::llm::LlmClient;
use chrono::Utc;
use std::sync::Arc;

/// Relays one market analysis to a remote model and normalises the answer.
#[derive(Clone)]
pub struct RemoteModelProvider {
    client: Arc<dyn LlmClient>,
    variant: PromptVariant,
}

impl RemoteModelProvider {
    pub fn new(client: Arc<dyn LlmClient>, variant: PromptVariant) -> Self {
        Self { client, variant }
    }

    /// Configured prompt variant, or the one that suits the client.
    pub fn from_settings(client: Arc<dyn LlmClient>, settings: &Settings) -> Self {
        let variant = PromptVariant::resolve(settings.prompt_variant.as_deref(), client.provider());
        Self::new(client, variant)
    }

    pub fn variant(&self) -> PromptVariant {
        self.variant
    }

    /// One upstream call, no retries. Errors are returned as-is.
    pub async fn try_analyze_market(
        &self,
        input: &ProductInput,
        market: &str,
    ) -> anyhow::Result<MarketAnalysis> {
        let now = Utc::now();
        let prompt = prompt::build_prompt(input, market, self.variant, now);
        let text = self.client.complete_json(&prompt).await?;
        json::parse_market_analysis(&text, market, now)
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for RemoteModelProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RemoteModel
    }

    async fn analyze_market(&self, input: &ProductInput, market: &str) -> MarketAnalysis {
        match self.try_analyze_market(input, market).await {
            Ok(analysis) => {
                tracing::info!(
                    market,
                    provider = self.client.provider().as_str(),
                    score = analysis.overall_score,
                    recommendation = analysis.recommendation.as_str(),
                    "market analysed"
                );
                analysis
            }
            Err(err) => {
                let raw_output = err
                    .downcast_ref::<LlmDiagnosticsError>()
                    .and_then(|d| d.raw_output.as_deref());
                tracing::error!(
                    market,
                    provider = self.client.provider().as_str(),
                    error = %format!("{err:#}"),
                    raw_output,
                    "market analysis failed; returning fallback record"
                );
                MarketAnalysis::fallback(market, Utc::now())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Level, Recommendation};
    use crate::llm::Provider;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned responses and records prompts.
    struct ScriptedClient {
        replies: Mutex<Vec<anyhow::Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<anyhow::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::default(),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider(&self) -> Provider {
            Provider::ChatCompletions
        }

        async fn complete_json(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
        }
    }

    fn input() -> ProductInput {
        ProductInput {
            product_name: "Desk Lamp".to_string(),
            category: "Home & Garden".to_string(),
            description: "LED desk lamp".to_string(),
            cost_price: 8.0,
            selling_price: 30.0,
            target_markets: vec!["Canada".to_string()],
            current_market: "Vietnam".to_string(),
            ..Default::default()
        }
    }

    fn reply(market: &str, score: u32) -> anyhow::Result<String> {
        Ok(json!({"market": market, "overallScore": score}).to_string())
    }

    #[tokio::test]
    async fn returns_parsed_analysis_on_success() {
        let client = ScriptedClient::new(vec![reply("Canada", 74)]);
        let provider = RemoteModelProvider::new(client.clone(), PromptVariant::Standard);

        let analysis = provider.analyze_market(&input(), "Canada").await;
        assert_eq!(analysis.market, "Canada");
        assert_eq!(analysis.overall_score, 74.0);
        assert_eq!(analysis.recommendation, Recommendation::Recommended);

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Desk Lamp"));
    }

    #[tokio::test]
    async fn upstream_error_yields_fallback_without_retry() {
        let client = ScriptedClient::new(vec![Err(LlmDiagnosticsError {
            provider: Provider::ChatCompletions,
            stage: "http",
            detail: "status=503 Service Unavailable".to_string(),
            raw_output: Some("overloaded".to_string()),
        }
        .into())]);
        let provider = RemoteModelProvider::new(client.clone(), PromptVariant::Standard);

        let analysis = provider.analyze_market(&input(), "Canada").await;
        assert_eq!(analysis.overall_score, 0.0);
        assert_eq!(analysis.scores.legal_compliance, 0.0);
        assert_eq!(analysis.scores.competitive_analysis, 0.0);
        assert_eq!(analysis.scores.market_demand, 0.0);
        assert_eq!(analysis.scores.pricing_strategy, 0.0);
        assert_eq!(analysis.scores.cultural_adaptation, 0.0);
        assert_eq!(analysis.legal_compliance.risk_level, Level::High);
        assert_eq!(analysis.market, "Canada");
        assert_eq!(client.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_output_yields_fallback() {
        let client = ScriptedClient::new(vec![
            Ok("not json at all".to_string()),
            Ok(json!({"market": "Canada", "overallScore": "high"}).to_string()),
            Ok(json!({"overallScore": 80}).to_string()),
        ]);
        let provider = RemoteModelProvider::new(client, PromptVariant::Standard);

        for _ in 0..3 {
            let analysis = provider.analyze_market(&input(), "Canada").await;
            assert!(analysis.is_fallback());
            assert_eq!(analysis.recommendation, Recommendation::NotRecommended);
        }
    }

    #[tokio::test]
    async fn fenced_output_is_accepted() {
        let fenced = format!("```json\n{}\n```", reply("Canada", 91).unwrap());
        let client = ScriptedClient::new(vec![Ok(fenced)]);
        let provider = RemoteModelProvider::new(client, PromptVariant::Detailed);

        let analysis = provider.analyze_market(&input(), "Canada").await;
        assert_eq!(analysis.overall_score, 91.0);
        assert_eq!(analysis.recommendation, Recommendation::StronglyRecommended);
    }
}
