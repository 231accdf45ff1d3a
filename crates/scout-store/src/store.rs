//! Candidate store trait and shared query types.
//!
//! A store answers one kind of read: the `limit` nearest candidates to a
//! query vector among those satisfying every filter predicate. Filtering is
//! exact and happens before (or together with) ranking, never after a capped
//! neighbour list has been cut.

use async_trait::async_trait;
use scout_core::{CandidateProfile, CandidateRecord, Result, SearchFilters};
use uuid::Uuid;

/// A combined similarity + predicate query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    /// Query embedding; its length must equal the store dimension.
    pub vector: Vec<f32>,

    /// Normalized filters (see [`SearchFilters::normalized`]).
    pub filters: SearchFilters,

    /// Maximum number of hits.
    pub limit: usize,
}

impl StoreQuery {
    /// Create a query.
    pub fn new(vector: Vec<f32>, filters: SearchFilters, limit: usize) -> Self {
        Self {
            vector,
            filters,
            limit,
        }
    }
}

/// One stage-1 hit.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    /// Candidate display profile.
    pub profile: CandidateProfile,

    /// Cosine similarity to the query vector (higher = closer).
    pub similarity: f32,
}

impl StoreHit {
    /// The candidate identifier.
    pub fn id(&self) -> Uuid {
        self.profile.id
    }
}

/// Trait for candidate store backends.
///
/// Implementations must return hits ordered by similarity descending, ties
/// broken by id ascending, and an empty vector (not an error) when nothing
/// matches.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Nearest candidates satisfying every filter.
    async fn nearest(&self, query: &StoreQuery) -> Result<Vec<StoreHit>>;

    /// Insert or wholly replace a candidate record.
    async fn upsert(&self, record: CandidateRecord) -> Result<()>;

    /// Number of stored records (including those without an embedding).
    async fn count(&self) -> Result<usize>;

    /// The embedding dimension this store holds.
    fn dimension(&self) -> usize;

    /// The backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Cosine similarity of two equal-length vectors; 0.0 if either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() { sim } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn CandidateStore) {}
    }
}
