pub mod orchestrator;

use crate::config::Settings;
use crate::domain::analysis::MarketAnalysis;
use crate::domain::product::ProductInput;
use crate::heuristic::provider::HeuristicProvider;
use crate::llm::{self, relay::RemoteModelProvider};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    RemoteModel,
    Heuristic,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteModel => "remote_model",
            Self::Heuristic => "heuristic",
        }
    }
}

/// Produces the analysis of one market. Implementations never fail: upstream
/// problems are absorbed into a degraded but well-formed result.
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn analyze_market(&self, input: &ProductInput, market: &str) -> MarketAnalysis;
}

/// Provider for the configured backend: the remote model when one is selected,
/// otherwise the local heuristic scorer.
pub fn provider_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn AnalysisProvider>> {
    let provider: Arc<dyn AnalysisProvider> = match llm::client_from_settings(settings)? {
        Some(client) => Arc::new(RemoteModelProvider::from_settings(client, settings)),
        None => Arc::new(HeuristicProvider),
    };
    tracing::info!(
        provider = provider.kind().as_str(),
        backend = ?settings.backend,
        "analysis provider ready"
    );
    Ok(provider)
}
