//! Router and request handlers.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use scout_cache::CacheStats;
use scout_core::{RankedCandidate, Result, SearchFilters};
use scout_search::SearchOrchestrator;

use crate::auth::AdminKey;
use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The search pipeline.
    pub orchestrator: SearchOrchestrator,
    /// Credential guarding the cache endpoints.
    pub admin: AdminKey,
}

impl AppState {
    /// State with admin access disabled.
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self {
            orchestrator,
            admin: AdminKey::disabled(),
        }
    }

    /// Guard the cache endpoints with `key`.
    pub fn with_admin_key(mut self, key: impl AsRef<str>) -> Self {
        self.admin = AdminKey::new(key);
        self
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================================
// Request and response bodies
// ============================================================================

/// Body of `POST /search`.
///
/// Filters may be given nested under `filters`, as top-level fields, or both;
/// the two sets are merged.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// Free-text query.
    #[serde(default)]
    pub query: String,
    /// Untyped filter map.
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    /// Location filter.
    #[serde(default)]
    pub location: Option<Value>,
    /// Minimum experience filter.
    #[serde(default)]
    pub min_experience: Option<Value>,
    /// Required skills filter.
    #[serde(default)]
    pub skills: Option<Value>,
    /// Number of results wanted. Out-of-range values are clamped, so zero
    /// and negative counts ask for one result.
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl SearchRequest {
    /// The requested result count, raised to at least one.
    pub fn top_k(&self) -> Option<usize> {
        self.top_k.map(|k| usize::try_from(k.max(1)).unwrap_or(usize::MAX))
    }

    /// Resolve nested and top-level filters into one set.
    pub fn resolve_filters(&self) -> Result<SearchFilters> {
        let nested = match &self.filters {
            Some(map) => SearchFilters::from_json_map(map)?,
            None => SearchFilters::new(),
        };

        let mut flat = Map::new();
        for (key, value) in [
            ("location", &self.location),
            ("min_experience", &self.min_experience),
            ("skills", &self.skills),
        ] {
            if let Some(value) = value {
                flat.insert(key.to_string(), value.clone());
            }
        }
        nested.merge(SearchFilters::from_json_map(&flat)?)
    }
}

/// One ranked candidate in a search response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateHit {
    /// Candidate id.
    pub id: Uuid,
    /// Display name.
    pub full_name: String,
    /// Current title.
    pub professional_title: Option<String>,
    /// Location.
    pub location: String,
    /// Years of experience.
    pub years_experience: u32,
    /// Skills.
    pub skills: Vec<String>,
    /// Profile summary.
    pub summary: Option<String>,
    /// Stage-1 similarity.
    pub stage1_score: f32,
    /// Stage-2 rerank score; results are ordered by it.
    pub score: f32,
}

impl From<RankedCandidate> for CandidateHit {
    fn from(ranked: RankedCandidate) -> Self {
        let profile = ranked.profile;
        Self {
            id: profile.id,
            full_name: profile.full_name,
            professional_title: profile.professional_title,
            location: profile.location,
            years_experience: profile.years_experience,
            skills: profile.skills.into_iter().collect(),
            summary: profile.summary,
            stage1_score: ranked.stage1_score,
            score: ranked.stage2_score,
        }
    }
}

/// Body returned by `POST /search`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked candidates.
    pub results: Vec<CandidateHit>,
    /// Whether the results came from the cache.
    pub cached: bool,
    /// Handler wall time.
    pub took_ms: u64,
}

/// Body returned by `POST /cache/invalidate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    /// Always `"success"`.
    pub status: String,
    /// Number of cache entries removed.
    pub deleted_keys: u64,
}

/// Body returned by `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Candidate store backend.
    pub store: String,
    /// Cache backend.
    pub cache: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn search(
    State(state): State<AppState>,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> std::result::Result<Json<SearchResponse>, ApiError> {
    let started = Instant::now();
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let filters = request.resolve_filters()?;

    let outcome = state
        .orchestrator
        .search(&request.query, &filters, request.top_k())
        .await?;

    let took_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        cached = outcome.cached,
        results = outcome.results.len(),
        took_ms,
        "search served"
    );
    Ok(Json(SearchResponse {
        results: outcome.results.items.into_iter().map(CandidateHit::from).collect(),
        cached: outcome.cached,
        took_ms,
    }))
}

async fn cache_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> std::result::Result<Json<CacheStats>, ApiError> {
    state.admin.check(&headers)?;
    Ok(Json(state.orchestrator.cache_stats().await?))
}

async fn invalidate_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> std::result::Result<Json<InvalidateResponse>, ApiError> {
    state.admin.check(&headers)?;
    let deleted_keys = state.orchestrator.invalidate_all().await?;
    tracing::info!(deleted_keys, "cache invalidated via API");
    Ok(Json(InvalidateResponse {
        status: "success".to_string(),
        deleted_keys,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        store: state.orchestrator.store_name().to_string(),
        cache: state.orchestrator.cache_backend_name().to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use scout_cache::{CacheMetrics, MemoryCacheBackend, ResultCache};
    use scout_core::{CandidateProfile, CandidateRecord};
    use scout_rerank::MockReranker;
    use scout_search::SearchSettings;
    use scout_store::{CandidateStore, MemoryCandidateStore, MockEmbeddingProvider};

    const KEY: &str = "admin-key";

    async fn app_with(reranker: MockReranker) -> Router {
        let embedder = Arc::new(MockEmbeddingProvider::new(16));
        let store = Arc::new(MemoryCandidateStore::new(16));
        for (id, title, location, years) in [
            (1, "Senior Backend Engineer", "Berlin", 8),
            (2, "Backend Engineer", "Berlin", 3),
            (3, "Designer", "Lisbon", 6),
        ] {
            let profile = CandidateProfile::new(Uuid::from_u128(id), format!("c{id}"))
                .with_title(title)
                .with_location(location)
                .with_experience(years)
                .with_skill("rust");
            let vector = embedder.embed_sync(title);
            store.upsert(CandidateRecord::new(profile, vector)).await.unwrap();
        }

        let cache = ResultCache::new(
            Arc::new(MemoryCacheBackend::new()),
            Arc::new(CacheMetrics::new()),
        );
        let orchestrator = SearchOrchestrator::new(
            embedder,
            store,
            Arc::new(reranker),
            cache,
            SearchSettings::default(),
        );
        router(AppState::new(orchestrator).with_admin_key(KEY))
    }

    async fn app() -> Router {
        app_with(MockReranker::new()).await
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_search_then_cached() {
        let app = app().await;
        let body = serde_json::json!({
            "query": "Senior backend engineer",
            "location": "Berlin",
            "min_experience": 5,
            "top_k": 5
        });

        let first = app.clone().oneshot(post_json("/search", body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first: SearchResponse = serde_json::from_value(json_body(first).await).unwrap();
        assert!(!first.cached);
        assert_eq!(first.results.len(), 1);
        assert_eq!(first.results[0].id, Uuid::from_u128(1));
        assert_eq!(first.results[0].skills, vec!["rust".to_string()]);

        let second = app.oneshot(post_json("/search", body)).await.unwrap();
        let second: SearchResponse = serde_json::from_value(json_body(second).await).unwrap();
        assert!(second.cached);
        assert_eq!(second.results[0].id, first.results[0].id);
    }

    #[tokio::test]
    async fn test_nested_filters() {
        let app = app().await;
        let response = app
            .oneshot(post_json(
                "/search",
                serde_json::json!({
                    "query": "designer",
                    "filters": {"location": "lisbon"}
                }),
            ))
            .await
            .unwrap();
        let body: SearchResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body.results.len(), 1);
        assert_eq!(body.results[0].id, Uuid::from_u128(3));
    }

    #[tokio::test]
    async fn test_invalid_input_is_400() {
        let app = app().await;
        for body in [
            serde_json::json!({"query": "   "}),
            serde_json::json!({"query": "x", "filters": {"salary": 10}}),
            serde_json::json!({"query": "x", "min_experience": "lots"}),
            serde_json::json!({
                "query": "x",
                "location": "Berlin",
                "filters": {"location": "Paris"}
            }),
            serde_json::json!({"query": "x", "top_k": "five"}),
        ] {
            let response = app.clone().oneshot(post_json("/search", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(json_body(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_out_of_range_top_k_is_clamped() {
        let app = app().await;
        for top_k in [-1, 0] {
            let body = serde_json::json!({"query": "backend engineer", "top_k": top_k});
            let response = app.clone().oneshot(post_json("/search", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body: SearchResponse = serde_json::from_value(json_body(response).await).unwrap();
            assert_eq!(body.results.len(), 1);
        }

        let body = serde_json::json!({"query": "backend engineer", "top_k": 1_000_000});
        let response = app.oneshot(post_json("/search", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: SearchResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body.results.len(), 3);
    }

    #[test]
    fn test_request_top_k() {
        let request = |top_k| SearchRequest {
            top_k,
            ..SearchRequest::default()
        };
        assert_eq!(request(None).top_k(), None);
        assert_eq!(request(Some(-7)).top_k(), Some(1));
        assert_eq!(request(Some(0)).top_k(), Some(1));
        assert_eq!(request(Some(12)).top_k(), Some(12));
    }

    #[tokio::test]
    async fn test_dependency_failure_is_503() {
        let reranker = MockReranker::new();
        reranker.set_failing(true);
        let app = app_with(reranker).await;

        let response = app
            .oneshot(post_json("/search", serde_json::json!({"query": "engineer"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["dependency"], "reranker");
    }

    #[tokio::test]
    async fn test_admin_endpoints_require_key() {
        let app = app().await;

        let missing = app.clone().oneshot(admin("GET", "/cache/stats", None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .clone()
            .oneshot(admin("POST", "/cache/invalidate", Some("nope")))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

        let ok = app.oneshot(admin("GET", "/cache/stats", Some(KEY))).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let stats: CacheStats = serde_json::from_value(json_body(ok).await).unwrap();
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn test_admin_disabled_without_key() {
        let orchestrator = SearchOrchestrator::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            Arc::new(MemoryCandidateStore::new(4)),
            Arc::new(MockReranker::new()),
            ResultCache::new(
                Arc::new(MemoryCacheBackend::new()),
                Arc::new(CacheMetrics::new()),
            ),
            SearchSettings::default(),
        );
        let no_admin = router(AppState::new(orchestrator));

        let response = no_admin
            .clone()
            .oneshot(admin("GET", "/cache/stats", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = no_admin.oneshot(admin("GET", "/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalidate_reports_deleted_keys() {
        let app = app().await;
        for query in ["backend", "designer"] {
            app.clone()
                .oneshot(post_json("/search", serde_json::json!({"query": query})))
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(admin("POST", "/cache/invalidate", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: InvalidateResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body.status, "success");
        assert_eq!(body.deleted_keys, 2);

        let again = app
            .oneshot(post_json("/search", serde_json::json!({"query": "backend"})))
            .await
            .unwrap();
        let again: SearchResponse = serde_json::from_value(json_body(again).await).unwrap();
        assert!(!again.cached);
    }

    #[tokio::test]
    async fn test_health_names_backends() {
        let response = app().await.oneshot(admin("GET", "/health", None)).await.unwrap();
        let body: HealthResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.store, "memory");
        assert_eq!(body.cache, "memory");
    }
}
