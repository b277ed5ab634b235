//! Fixed-window, per-client request limiting.
//!
//! The limiter itself is stateless; counters live behind [`RateLimitStore`] so a
//! shared backing store can replace the in-process map without touching callers.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub resets_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically bumps the counter for `key`. A missing or expired record
    /// (`now > resets_at`) is replaced by `count = 1, resets_at = now + window`.
    async fn increment_with_expiry(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RateLimitRecord>;
}

/// Process-local store. Records are never purged, only reset on rollover.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait::async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn increment_with_expiry(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RateLimitRecord> {
        let mut records = self.records.lock();
        let record = records
            .entry(key.to_string())
            .and_modify(|r| {
                if now > r.resets_at {
                    r.count = 1;
                    r.resets_at = now + window;
                } else {
                    r.count = r.count.saturating_add(1);
                }
            })
            .or_insert(RateLimitRecord {
                count: 1,
                resets_at: now + window,
            });
        Ok(*record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Whole seconds until the window rolls over (at least 1).
    pub retry_after_secs: u64,
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit: limit.max(1),
            window,
        }
    }

    /// In-memory limiter with the default one-minute window.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(
            Arc::new(InMemoryRateLimitStore::new()),
            limit,
            Duration::seconds(DEFAULT_WINDOW_SECS),
        )
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn check(&self, key: &str) -> anyhow::Result<RateLimitDecision> {
        self.check_at(key, Utc::now()).await
    }

    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> anyhow::Result<RateLimitDecision> {
        let record = self
            .store
            .increment_with_expiry(key, self.window, now)
            .await?;

        let allowed = record.count <= self.limit;
        let retry_after_secs = (record.resets_at - now).num_seconds().max(1) as u64;

        if !allowed {
            tracing::warn!(client = key, count = record.count, limit = self.limit, "rate limit exceeded");
        }

        Ok(RateLimitDecision {
            allowed,
            remaining: self.limit.saturating_sub(record.count),
            retry_after_secs,
        })
    }
}
