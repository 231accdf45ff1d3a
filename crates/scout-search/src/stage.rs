//! Typed pipeline stages.
//!
//! Each stage owns one external dependency and wraps every call to it in its
//! own `tokio::time::timeout`. Any failure inside a stage, an expired
//! deadline included, leaves it as [`Error::DependencyUnavailable`] naming
//! that dependency.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use scout_core::{Dependency, Error, RankedCandidate, RankedResultSet, Result, SearchFilters};
use scout_rerank::{candidate_text, validate_scores, RerankOracle};
use scout_store::{CandidateStore, EmbeddingProvider, StoreHit, StoreQuery};

/// One step of the search pipeline with typed input and output.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// What the stage consumes.
    type Input: Send + 'static;
    /// What the stage produces.
    type Output: Send + 'static;

    /// Stable stage name for logs.
    fn name(&self) -> &'static str;

    /// Run the stage.
    async fn run(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Run `fut` under `limit`, mapping every failure onto `dependency`.
pub async fn guarded<T, F>(dependency: Dependency, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err @ Error::DependencyUnavailable { .. })) => Err(err),
        Ok(Err(err)) => Err(Error::dependency(dependency, err.to_string())),
        Err(_) => Err(Error::dependency(
            dependency,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}

// ============================================================================
// Stage payloads
// ============================================================================

/// Normalized query text handed to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText(pub String);

/// Embedding of the query text.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVector(pub Vec<f32>);

/// Input of stage-1 retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    /// Query embedding.
    pub vector: QueryVector,
    /// Normalized filters.
    pub filters: SearchFilters,
    /// Number of candidates to over-fetch.
    pub pool_size: usize,
}

/// Stage-1 output: candidates ordered by similarity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    /// Hits in similarity order.
    pub hits: Vec<StoreHit>,
}

impl CandidatePool {
    /// Number of pooled candidates.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Input of stage-2 reranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankRequest {
    /// Normalized query text.
    pub query: String,
    /// Stage-1 pool.
    pub pool: CandidatePool,
    /// Results to keep.
    pub top_k: usize,
}

// ============================================================================
// Embed
// ============================================================================

/// Turns query text into a vector of the store's dimension.
pub struct EmbedStage {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    timeout: Duration,
}

impl EmbedStage {
    /// Create the stage; vectors must have length `dimension`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize, timeout: Duration) -> Self {
        Self {
            provider,
            dimension,
            timeout,
        }
    }
}

#[async_trait]
impl PipelineStage for EmbedStage {
    type Input = QueryText;
    type Output = QueryVector;

    fn name(&self) -> &'static str {
        "embed"
    }

    async fn run(&self, input: QueryText) -> Result<QueryVector> {
        let vector = guarded(
            Dependency::Embedding,
            self.timeout,
            self.provider.embed(&input.0),
        )
        .await?;

        if vector.len() != self.dimension {
            return Err(Error::dependency(
                Dependency::Embedding,
                format!(
                    "{} returned dimension {}, expected {}",
                    self.provider.name(),
                    vector.len(),
                    self.dimension
                ),
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::dependency(
                Dependency::Embedding,
                "embedding contains non-finite values",
            ));
        }
        Ok(QueryVector(vector))
    }
}

// ============================================================================
// Retrieve
// ============================================================================

/// Stage-1: one combined similarity + filter query against the store.
pub struct RetrievalStage {
    store: Arc<dyn CandidateStore>,
    timeout: Duration,
}

impl RetrievalStage {
    /// Create the stage.
    pub fn new(store: Arc<dyn CandidateStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl PipelineStage for RetrievalStage {
    type Input = RetrievalRequest;
    type Output = CandidatePool;

    fn name(&self) -> &'static str {
        "retrieve"
    }

    async fn run(&self, input: RetrievalRequest) -> Result<CandidatePool> {
        let query = StoreQuery::new(input.vector.0, input.filters, input.pool_size);
        let mut hits = guarded(Dependency::Store, self.timeout, self.store.nearest(&query)).await?;
        hits.retain(|hit| hit.similarity.is_finite());
        hits.truncate(input.pool_size);
        Ok(CandidatePool { hits })
    }
}

// ============================================================================
// Rerank
// ============================================================================

/// Stage-2: precision scoring of the pool, then merge, sort and truncate.
pub struct RerankStage {
    oracle: Arc<dyn RerankOracle>,
    timeout: Duration,
}

impl RerankStage {
    /// Create the stage.
    pub fn new(oracle: Arc<dyn RerankOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }
}

#[async_trait]
impl PipelineStage for RerankStage {
    type Input = RerankRequest;
    type Output = RankedResultSet;

    fn name(&self) -> &'static str {
        "rerank"
    }

    async fn run(&self, input: RerankRequest) -> Result<RankedResultSet> {
        if input.pool.is_empty() {
            return Ok(RankedResultSet::empty());
        }

        let texts: Vec<String> = input
            .pool
            .hits
            .iter()
            .map(|hit| candidate_text(&hit.profile))
            .collect();

        let scores = guarded(
            Dependency::Reranker,
            self.timeout,
            self.oracle.score(&input.query, &texts),
        )
        .await?;
        let scores = validate_scores(scores, texts.len())?;

        let items = input
            .pool
            .hits
            .into_iter()
            .zip(scores)
            .map(|(hit, score)| RankedCandidate::new(hit.profile, hit.similarity, score))
            .collect();

        Ok(RankedResultSet::from_scored(items, input.top_k))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scout_core::{CandidateProfile, CandidateRecord};
    use scout_rerank::MockReranker;
    use scout_store::{MemoryCandidateStore, MockEmbeddingProvider};
    use uuid::Uuid;

    struct WrongDimension;

    #[async_trait]
    impl EmbeddingProvider for WrongDimension {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
        fn dimension(&self) -> usize {
            3
        }
        fn name(&self) -> &str {
            "wrong"
        }
    }

    fn hit(id: u128, title: &str, similarity: f32) -> StoreHit {
        StoreHit {
            profile: CandidateProfile::new(Uuid::from_u128(id), format!("c{id}")).with_title(title),
            similarity,
        }
    }

    #[tokio::test]
    async fn test_guarded_maps_errors_and_timeouts() {
        let err = guarded::<(), _>(Dependency::Store, Duration::from_secs(1), async {
            Err(Error::invalid_data("boom"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.failed_dependency(), Some(Dependency::Store));

        tokio::time::pause();
        let err = guarded::<(), _>(Dependency::Reranker, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out after 10ms"));
    }

    #[tokio::test]
    async fn test_embed_stage_checks_dimension() {
        let stage = EmbedStage::new(Arc::new(WrongDimension), 8, Duration::from_secs(1));
        let err = stage.run(QueryText("q".into())).await.unwrap_err();
        assert_eq!(err.failed_dependency(), Some(Dependency::Embedding));

        let ok = EmbedStage::new(
            Arc::new(MockEmbeddingProvider::new(8)),
            8,
            Duration::from_secs(1),
        );
        assert_eq!(ok.run(QueryText("q".into())).await.unwrap().0.len(), 8);
    }

    #[tokio::test]
    async fn test_retrieval_stage() {
        let store = Arc::new(MemoryCandidateStore::new(2));
        store
            .upsert(CandidateRecord::new(
                CandidateProfile::new(Uuid::from_u128(1), "a"),
                vec![1.0, 0.0],
            ))
            .await
            .unwrap();
        let stage = RetrievalStage::new(store, Duration::from_secs(1));
        let pool = stage
            .run(RetrievalRequest {
                vector: QueryVector(vec![1.0, 0.0]),
                filters: SearchFilters::new(),
                pool_size: 10,
            })
            .await
            .unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieval_stage_maps_store_errors() {
        let store = Arc::new(MemoryCandidateStore::new(2));
        let stage = RetrievalStage::new(store, Duration::from_secs(1));
        let err = stage
            .run(RetrievalRequest {
                vector: QueryVector(vec![1.0]),
                filters: SearchFilters::new(),
                pool_size: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(err.failed_dependency(), Some(Dependency::Store));
    }

    #[tokio::test]
    async fn test_rerank_stage_sorts_and_truncates() {
        let stage = RerankStage::new(Arc::new(MockReranker::new()), Duration::from_secs(1));
        let result = stage
            .run(RerankRequest {
                query: "backend engineer".into(),
                pool: CandidatePool {
                    hits: vec![
                        hit(1, "Florist", 0.99),
                        hit(2, "Backend Engineer", 0.50),
                        hit(3, "Backend Developer", 0.70),
                    ],
                },
                top_k: 2,
            })
            .await
            .unwrap();

        assert_eq!(result.ids(), vec![Uuid::from_u128(2), Uuid::from_u128(3)]);
        assert_eq!(result.items[0].stage1_score, 0.50);
        assert!(result.is_well_ordered());
    }

    #[tokio::test]
    async fn test_rerank_stage_skips_oracle_for_empty_pool() {
        let oracle = Arc::new(MockReranker::new());
        let stage = RerankStage::new(oracle.clone(), Duration::from_secs(1));
        let result = stage
            .run(RerankRequest {
                query: "q".into(),
                pool: CandidatePool::default(),
                top_k: 5,
            })
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(oracle.calls(), 0);
    }
}
