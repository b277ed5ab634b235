//! Runs one analysis per target market, strictly one at a time.
//!
//! Markets become an explicit task list that a single worker task consumes in
//! order, pausing between items. Each task hands back a [`MarketTicket`] so
//! callers could await markets individually.

use crate::analysis::AnalysisProvider;
use crate::domain::analysis::MarketAnalysis;
use crate::domain::product::ProductInput;
use anyhow::Context;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::ops::Index;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Per-market results in request order. Serialises as a JSON object keyed by
/// market name, with keys in the order the markets were requested.
#[derive(Debug, Clone, Default)]
pub struct MarketResults(Vec<(String, MarketAnalysis)>);

impl MarketResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a market. Callers insert each market once.
    pub fn push(&mut self, market: String, analysis: MarketAnalysis) {
        self.0.push((market, analysis));
    }

    pub fn get(&self, market: &str) -> Option<&MarketAnalysis> {
        self.0.iter().find(|(m, _)| m == market).map(|(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn markets(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(m, _)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MarketAnalysis)> {
        self.0.iter().map(|(m, a)| (m.as_str(), a))
    }
}

impl Index<&str> for MarketResults {
    type Output = MarketAnalysis;

    fn index(&self, market: &str) -> &MarketAnalysis {
        match self.get(market) {
            Some(analysis) => analysis,
            None => panic!("no result for market {market:?}"),
        }
    }
}

impl Serialize for MarketResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (market, analysis) in &self.0 {
            map.serialize_entry(market, analysis)?;
        }
        map.end()
    }
}

pub struct MarketTicket {
    pub market: String,
    rx: oneshot::Receiver<MarketAnalysis>,
}

impl MarketTicket {
    pub async fn wait(self) -> anyhow::Result<MarketAnalysis> {
        self.rx
            .await
            .with_context(|| format!("analysis worker stopped before market {}", self.market))
    }
}

#[derive(Clone)]
pub struct MarketQueue {
    provider: Arc<dyn AnalysisProvider>,
    pause: Duration,
}

impl MarketQueue {
    pub fn new(provider: Arc<dyn AnalysisProvider>, pause: Duration) -> Self {
        Self { provider, pause }
    }

    /// Enqueues every distinct target market (first occurrence wins) and starts
    /// the worker. The worker runs to completion even if tickets are dropped.
    pub fn submit(&self, input: Arc<ProductInput>) -> Vec<MarketTicket> {
        let mut seen = HashSet::new();
        let mut tasks = Vec::new();
        let mut tickets = Vec::new();
        for market in &input.target_markets {
            if !seen.insert(market.clone()) {
                tracing::debug!(%market, "duplicate target market skipped");
                continue;
            }
            let (tx, rx) = oneshot::channel();
            tasks.push((market.clone(), tx));
            tickets.push(MarketTicket {
                market: market.clone(),
                rx,
            });
        }

        let provider = self.provider.clone();
        let pause = self.pause;
        tokio::spawn(async move {
            let total = tasks.len();
            for (i, (market, tx)) in tasks.into_iter().enumerate() {
                tracing::info!(%market, position = i + 1, total, "analysing market");
                let analysis = provider.analyze_market(&input, &market).await;
                if tx.send(analysis).is_err() {
                    tracing::debug!(%market, "analysis finished after its caller went away");
                }
                if i + 1 < total {
                    tokio::time::sleep(pause).await;
                }
            }
        });

        tickets
    }
}

/// Analyses every target market and returns once all of them have a result.
pub async fn analyze_product(
    provider: Arc<dyn AnalysisProvider>,
    input: Arc<ProductInput>,
    pause: Duration,
) -> anyhow::Result<MarketResults> {
    let tickets = MarketQueue::new(provider.clone(), pause).submit(input);
    let total = tickets.len();

    let mut results = MarketResults::new();
    for ticket in tickets {
        let market = ticket.market.clone();
        let analysis = ticket.wait().await?;
        results.push(market, analysis);
    }

    let degraded = results.iter().filter(|(_, a)| a.is_fallback()).count();
    tracing::info!(
        provider = provider.kind().as_str(),
        markets = total,
        degraded,
        "analysis run complete"
    );
    Ok(results)
}
