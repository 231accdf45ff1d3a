//! The search result cache.
//!
//! [`ResultCache`] maps query fingerprints to complete ranked result sets.
//! Entries are stored as a JSON envelope carrying the fingerprint, creation
//! time and TTL next to the result, so a reader can check that the bytes it
//! got belong to the key it asked for and are still fresh.
//!
//! Read-side anomalies never reach the caller: a backend failure or an entry
//! that does not decode counts as a miss. Corrupt entries are also deleted
//! so the next writer can replace them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scout_core::{Error, Fingerprint, RankedResultSet, Result};

use crate::backend::CacheBackend;
use crate::metrics::{CacheMetrics, CacheStats};

/// Key namespace for search results.
pub const SEARCH_NAMESPACE: &str = "search";

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Stored form of one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// Fingerprint the entry was written under.
    pub fingerprint: Fingerprint,
    /// Write time.
    pub created_at: DateTime<Utc>,
    /// Lifetime in seconds.
    pub ttl_secs: u64,
    /// The cached result.
    pub result: RankedResultSet,
}

impl CacheEnvelope {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX));
        match self.created_at.checked_add_signed(ttl) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Fingerprint-keyed cache of ranked result sets.
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    metrics: Arc<CacheMetrics>,
    namespace: String,
}

impl ResultCache {
    /// Create a cache over `backend`, counting into `metrics`.
    pub fn new(backend: Arc<dyn CacheBackend>, metrics: Arc<CacheMetrics>) -> Self {
        Self {
            backend,
            metrics,
            namespace: SEARCH_NAMESPACE.to_string(),
        }
    }

    /// Use a different key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// The storage backend.
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// The counters this cache writes to.
    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// The full backend key for a fingerprint.
    pub fn key(&self, fingerprint: &Fingerprint) -> String {
        fingerprint.cache_key(&self.namespace)
    }

    fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    /// Look up a fingerprint. Never fails: anomalies are reported as a miss.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<RankedResultSet> {
        let key = self.key(fingerprint);
        let bytes = match self.backend.get_raw(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.metrics.record_miss();
                return None;
            }
            Err(err) => {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    backend = self.backend.name(),
                    error = %err,
                    "cache read failed; treating as miss"
                );
                self.metrics.record_miss();
                return None;
            }
        };

        match decode(fingerprint, &bytes) {
            Ok(envelope) if envelope.is_expired(Utc::now()) => {
                tracing::debug!(fingerprint = %fingerprint, "cache entry past its TTL");
                self.metrics.record_miss();
                self.discard(&key).await;
                None
            }
            Ok(envelope) => {
                self.metrics.record_hit();
                Some(envelope.result)
            }
            Err(err) => {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    error = %err,
                    "discarding corrupt cache entry"
                );
                self.metrics.record_corrupt();
                self.metrics.record_miss();
                self.discard(&key).await;
                None
            }
        }
    }

    /// Store a result. Last writer wins.
    ///
    /// A zero TTL disables caching for this write.
    pub async fn put(
        &self,
        fingerprint: &Fingerprint,
        result: &RankedResultSet,
        ttl: Duration,
    ) -> Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        let envelope = CacheEnvelope {
            fingerprint: *fingerprint,
            created_at: Utc::now(),
            ttl_secs: ttl.as_secs().max(1),
            result: result.clone(),
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.backend.set_raw(&self.key(fingerprint), bytes, ttl).await?;
        tracing::debug!(fingerprint = %fingerprint, items = result.len(), "cached search result");
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.backend.delete(&self.key(fingerprint)).await
    }

    /// Remove every entry in the namespace. Returns the number removed.
    pub async fn invalidate_all(&self) -> Result<u64> {
        let deleted = self.backend.delete_prefix(&self.prefix()).await?;
        tracing::info!(namespace = %self.namespace, deleted, "search cache flushed");
        Ok(deleted)
    }

    /// Current counters plus the live entry count.
    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self.backend.count_prefix(&self.prefix()).await?;
        Ok(self.metrics.snapshot(entries))
    }

    async fn discard(&self, key: &str) {
        if let Err(err) = self.backend.delete(key).await {
            tracing::warn!(key, error = %err, "failed to delete stale cache entry");
        }
    }
}

fn decode(fingerprint: &Fingerprint, bytes: &[u8]) -> Result<CacheEnvelope> {
    let envelope: CacheEnvelope =
        serde_json::from_slice(bytes).map_err(|e| Error::cache_corrupt(e.to_string()))?;
    if envelope.fingerprint != *fingerprint {
        return Err(Error::cache_corrupt(format!(
            "entry written for {} found under {}",
            envelope.fingerprint, fingerprint
        )));
    }
    if !envelope.result.is_well_ordered() {
        return Err(Error::cache_corrupt("result set is not in rank order"));
    }
    Ok(envelope)
}

// ============================================================================
// Tests
// ============================================================================
