//! In-memory candidate store.
//!
//! Exhaustive scan: every retrievable record that satisfies the filters is
//! scored, so results are exact. Suitable for tests, demos and small pools.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use scout_core::{CandidateRecord, Error, Result};

use crate::store::{cosine_similarity, CandidateStore, StoreHit, StoreQuery};

/// Candidate store holding every record in a hash map.
pub struct MemoryCandidateStore {
    dimension: usize,
    records: RwLock<HashMap<Uuid, CandidateRecord>>,
    queries: AtomicUsize,
    limits: Mutex<Vec<usize>>,
}

impl MemoryCandidateStore {
    /// Create an empty store for vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(HashMap::new()),
            queries: AtomicUsize::new(0),
            limits: Mutex::new(Vec::new()),
        }
    }

    /// Number of `nearest` calls served so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// The `limit` of every `nearest` call served so far, oldest first.
    pub fn query_limits(&self) -> Vec<usize> {
        self.limits.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: Uuid) -> Option<CandidateRecord> {
        self.records.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn nearest(&self, query: &StoreQuery) -> Result<Vec<StoreHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.limits.lock() {
            log.push(query.limit);
        }

        if query.vector.len() != self.dimension {
            return Err(Error::invalid_data(format!(
                "query vector has dimension {}, store holds {}",
                query.vector.len(),
                self.dimension
            )));
        }
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let records = self.records.read().await;
        let mut hits: Vec<StoreHit> = records
            .values()
            .filter(|r| r.is_retrievable(self.dimension))
            .filter(|r| query.filters.matches(&r.profile))
            .filter_map(|r| {
                let embedding = r.embedding.as_deref()?;
                Some(StoreHit {
                    profile: r.profile.clone(),
                    similarity: cosine_similarity(&query.vector, embedding),
                })
            })
            .collect();
        drop(records);

        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });
        hits.truncate(query.limit);

        tracing::debug!(
            store = "memory",
            hits = hits.len(),
            limit = query.limit,
            "nearest query served"
        );
        Ok(hits)
    }

    async fn upsert(&self, record: CandidateRecord) -> Result<()> {
        if let Some(embedding) = &record.embedding {
            if embedding.len() != self.dimension {
                return Err(Error::invalid_data(format!(
                    "candidate {} has embedding dimension {}, store holds {}",
                    record.id(),
                    embedding.len(),
                    self.dimension
                )));
            }
        }
        self.records.write().await.insert(record.id(), record);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scout_core::{CandidateProfile, SearchFilters};

    fn record(id: u128, location: &str, years: u32, embedding: Vec<f32>) -> CandidateRecord {
        CandidateRecord::new(
            CandidateProfile::new(Uuid::from_u128(id), format!("Candidate {id}"))
                .with_location(location)
                .with_experience(years)
                .with_skill("Rust"),
            embedding,
        )
    }

    async fn seeded() -> MemoryCandidateStore {
        let store = MemoryCandidateStore::new(2);
        store.upsert(record(1, "Berlin", 7, vec![1.0, 0.0])).await.unwrap();
        store.upsert(record(2, "Berlin", 3, vec![0.9, 0.1])).await.unwrap();
        store.upsert(record(3, "Paris", 10, vec![1.0, 0.0])).await.unwrap();
        store.upsert(record(4, "berlin ", 12, vec![0.0, 1.0])).await.unwrap();
        store
            .upsert(CandidateRecord::pending(CandidateProfile::new(
                Uuid::from_u128(5),
                "No Embedding",
            )))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_nearest_orders_by_similarity() {
        let store = seeded().await;
        let hits = store
            .nearest(&StoreQuery::new(vec![1.0, 0.0], SearchFilters::new(), 10))
            .await
            .unwrap();

        assert_eq!(hits.len(), 4, "pending record must be excluded");
        // ids 1 and 3 tie at similarity 1.0; id ascending breaks the tie
        assert_eq!(hits[0].id(), Uuid::from_u128(1));
        assert_eq!(hits[1].id(), Uuid::from_u128(3));
        assert_eq!(hits[2].id(), Uuid::from_u128(2));
        assert_eq!(hits[3].id(), Uuid::from_u128(4));
    }

    #[tokio::test]
    async fn test_filters_apply_before_limit() {
        let store = seeded().await;
        let filters = SearchFilters::new()
            .with_location("Berlin")
            .with_min_experience(5)
            .normalized()
            .unwrap();
        let hits = store
            .nearest(&StoreQuery::new(vec![1.0, 0.0], filters, 1))
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn test_filters_keep_far_matches() {
        let store = seeded().await;
        let filters = SearchFilters::new()
            .with_min_experience(11)
            .normalized()
            .unwrap();
        let hits = store
            .nearest(&StoreQuery::new(vec![1.0, 0.0], filters, 1))
            .await
            .unwrap();

        // The only match is the least similar record overall.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), Uuid::from_u128(4));
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let store = seeded().await;
        let filters = SearchFilters::new()
            .with_location("Tokyo")
            .normalized()
            .unwrap();
        let hits = store
            .nearest(&StoreQuery::new(vec![1.0, 0.0], filters, 5))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let store = seeded().await;
        store.upsert(record(1, "Madrid", 1, vec![0.0, 1.0])).await.unwrap();

        let rec = store.get(Uuid::from_u128(1)).await.unwrap();
        assert_eq!(rec.profile.location, "Madrid");
        assert_eq!(rec.embedding, Some(vec![0.0, 1.0]));
        assert_eq!(store.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let store = MemoryCandidateStore::new(3);
        let err = store.upsert(record(1, "x", 1, vec![1.0])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let store = seeded().await;
        let err = store
            .nearest(&StoreQuery::new(vec![1.0], SearchFilters::new(), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(store.queries(), 1);
    }

    #[tokio::test]
    async fn test_query_limits_are_recorded() {
        let store = seeded().await;
        for limit in [3, 20] {
            store
                .nearest(&StoreQuery::new(vec![1.0, 0.0], SearchFilters::new(), limit))
                .await
                .unwrap();
        }
        assert_eq!(store.query_limits(), vec![3, 20]);
    }
}
