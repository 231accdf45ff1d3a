//! The search orchestrator.
//!
//! Drives one request through normalization, cache lookup and, on a miss,
//! the embed → retrieve → rerank → cache-store pipeline. Identical misses
//! arriving while a computation is running await that computation through the
//! in-flight registry instead of starting their own.

use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;

use scout_cache::{CacheStats, ResultCache};
use scout_core::{Fingerprint, NormalizedQuery, RankedResultSet, Result, SearchFilters};
use scout_rerank::RerankOracle;
use scout_store::{CandidateStore, EmbeddingProvider};

use crate::inflight::{Computed, InflightRegistry};
use crate::settings::SearchSettings;
use crate::stage::{
    EmbedStage, PipelineStage, QueryText, RerankRequest, RerankStage, RetrievalRequest,
    RetrievalStage,
};
use crate::trace::{SearchTrace, Stage, StageTiming};

/// The answer to one search request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Ranked candidates, at most top_k.
    pub results: RankedResultSet,
    /// Whether the results came from the cache.
    pub cached: bool,
    /// What ran to produce them.
    pub trace: SearchTrace,
}

struct Inner {
    embed: EmbedStage,
    retrieve: RetrievalStage,
    rerank: RerankStage,
    cache: ResultCache,
    settings: SearchSettings,
    inflight: InflightRegistry,
    store_name: String,
}

/// Two-stage search with result caching.
///
/// Cheap to clone; clones share the cache, the counters and the in-flight
/// registry.
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

impl SearchOrchestrator {
    /// Wire the orchestrator to its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CandidateStore>,
        reranker: Arc<dyn RerankOracle>,
        cache: ResultCache,
        settings: SearchSettings,
    ) -> Self {
        let store_name = store.name().to_string();
        let dimension = store.dimension();
        Self {
            inner: Arc::new(Inner {
                embed: EmbedStage::new(embedder, dimension, settings.embed_timeout),
                retrieve: RetrievalStage::new(store, settings.store_timeout),
                rerank: RerankStage::new(reranker, settings.rerank_timeout),
                cache,
                settings,
                inflight: InflightRegistry::new(),
                store_name,
            }),
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &SearchSettings {
        &self.inner.settings
    }

    /// Name of the candidate store backend.
    pub fn store_name(&self) -> &str {
        &self.inner.store_name
    }

    /// Name of the cache backend.
    pub fn cache_backend_name(&self) -> &str {
        self.inner.cache.backend().name()
    }

    /// Validate and normalize a raw request.
    pub fn normalize(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: Option<usize>,
    ) -> Result<NormalizedQuery> {
        NormalizedQuery::new(query_text, filters, top_k, &self.inner.settings.limits)
    }

    /// Run a search.
    ///
    /// Fails only with `InvalidQuery`, `InvalidFilter` or
    /// `DependencyUnavailable`; cache trouble is absorbed.
    pub async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: Option<usize>,
    ) -> Result<SearchOutcome> {
        let query = self.normalize(query_text, filters, top_k)?;
        let fingerprint = query.fingerprint();

        let started = Instant::now();
        let cached = self.inner.cache.get(&fingerprint).await;
        let lookup = StageTiming::new(
            Stage::CacheLookup,
            started.elapsed(),
            cached.as_ref().map_or(0, RankedResultSet::len),
        );

        if let Some(results) = cached {
            tracing::debug!(fingerprint = %fingerprint, items = results.len(), "cache hit");
            return Ok(SearchOutcome {
                results,
                cached: true,
                trace: SearchTrace {
                    stages: vec![lookup],
                    joined_inflight: false,
                },
            });
        }

        let inner = Arc::clone(&self.inner);
        let (computation, joined) = self
            .inner
            .inflight
            .join_or_start(fingerprint, move || async move {
                inner.compute(query, fingerprint).await
            })
            .await;
        if joined {
            tracing::debug!(fingerprint = %fingerprint, "joined in-flight search");
        }

        let outcome = computation.await;
        self.inner.inflight.finish(&fingerprint).await;
        let computed = outcome?;

        let mut stages = vec![lookup];
        if !joined {
            stages.extend(computed.stages);
        }
        Ok(SearchOutcome {
            results: computed.results,
            cached: false,
            trace: SearchTrace {
                stages,
                joined_inflight: joined,
            },
        })
    }

    /// Cache counters and live entry count.
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.inner.cache.stats().await
    }

    /// Drop the cached result for one fingerprint.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.inner.cache.invalidate(fingerprint).await
    }

    /// Drop every cached search result.
    pub async fn invalidate_all(&self) -> Result<u64> {
        self.inner.cache.invalidate_all().await
    }
}

impl Inner {
    async fn compute(&self, query: NormalizedQuery, fingerprint: Fingerprint) -> Result<Computed> {
        let mut stages = Vec::with_capacity(4);
        let pool_size = self.settings.pool_size(query.top_k);

        let started = Instant::now();
        let vector = self.embed.run(QueryText(query.text.clone())).await?;
        stages.push(StageTiming::new(Stage::Embed, started.elapsed(), vector.0.len()));

        let started = Instant::now();
        let pool = self
            .retrieve
            .run(RetrievalRequest {
                vector,
                filters: query.filters.clone(),
                pool_size,
            })
            .await?;
        stages.push(StageTiming::new(Stage::Retrieve, started.elapsed(), pool.len()));

        if pool.is_empty() {
            tracing::info!(fingerprint = %fingerprint, "no candidates match; skipping rerank");
            return Ok(Computed {
                results: RankedResultSet::empty(),
                stages,
            });
        }

        let pooled = pool.len();
        let started = Instant::now();
        let results = self
            .rerank
            .run(RerankRequest {
                query: query.text.clone(),
                pool,
                top_k: query.top_k,
            })
            .await?;
        stages.push(StageTiming::new(Stage::Rerank, started.elapsed(), results.len()));

        let started = Instant::now();
        if let Err(err) = self
            .cache
            .put(&fingerprint, &results, self.settings.cache_ttl)
            .await
        {
            tracing::warn!(
                fingerprint = %fingerprint,
                error = %err,
                "failed to cache search result"
            );
        }
        stages.push(StageTiming::new(Stage::CacheStore, started.elapsed(), results.len()));

        tracing::info!(
            fingerprint = %fingerprint,
            pool = pooled,
            results = results.len(),
            elapsed_ms = stages.iter().map(|s| s.elapsed_ms).sum::<u64>(),
            "search computed"
        );
        Ok(Computed { results, stages })
    }
}
