//! Orchestrator settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use scout_core::QueryLimits;

/// Default stage-1 pool multiplier.
pub const OVER_FETCH_FACTOR: usize = 4;

/// Smallest accepted pool multiplier.
pub const MIN_OVER_FETCH: usize = 3;

/// Largest accepted pool multiplier.
pub const MAX_OVER_FETCH: usize = 5;

/// Hard cap on the stage-1 pool, whatever top_k asks for.
pub const MAX_POOL_SIZE: usize = 200;

/// Tunables consumed by the search pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Lifetime of cached results.
    pub cache_ttl: Duration,

    /// Stage-1 pool size divided by top_k.
    pub over_fetch: usize,

    /// top_k default and ceiling.
    pub limits: QueryLimits,

    /// Deadline for the embedding call.
    pub embed_timeout: Duration,

    /// Deadline for the store query.
    pub store_timeout: Duration,

    /// Deadline for the reranker call.
    pub rerank_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            over_fetch: OVER_FETCH_FACTOR,
            limits: QueryLimits::default(),
            embed_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(5),
            rerank_timeout: Duration::from_secs(10),
        }
    }
}

impl SearchSettings {
    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the pool multiplier, clamped into `[3, 5]`. Lowers `max_top_k`
    /// if the new factor would push its pool past [`MAX_POOL_SIZE`].
    pub fn with_over_fetch(mut self, factor: usize) -> Self {
        self.over_fetch = factor.clamp(MIN_OVER_FETCH, MAX_OVER_FETCH);
        self.limits = self.capped(self.limits);
        self
    }

    /// Set top_k limits. `max_top_k` is capped at [`Self::top_k_ceiling`].
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = self.capped(limits);
        self
    }

    /// Largest top_k whose pool still gets the full over-fetch factor.
    pub fn top_k_ceiling(&self) -> usize {
        MAX_POOL_SIZE / self.factor()
    }

    /// Set all three dependency timeouts at once.
    pub fn with_timeouts(mut self, embed: Duration, store: Duration, rerank: Duration) -> Self {
        self.embed_timeout = embed;
        self.store_timeout = store;
        self.rerank_timeout = rerank;
        self
    }

    /// Stage-1 pool size for a clamped top_k.
    pub fn pool_size(&self, top_k: usize) -> usize {
        top_k.saturating_mul(self.factor()).min(MAX_POOL_SIZE)
    }

    fn factor(&self) -> usize {
        self.over_fetch.clamp(MIN_OVER_FETCH, MAX_OVER_FETCH)
    }

    fn capped(&self, limits: QueryLimits) -> QueryLimits {
        let max_top_k = limits.max_top_k.clamp(1, self.top_k_ceiling());
        QueryLimits {
            default_top_k: limits.default_top_k.clamp(1, max_top_k),
            max_top_k,
        }
    }
}
