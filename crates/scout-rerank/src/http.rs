//! HTTP cross-encoder client.
//!
//! Speaks the text-embeddings-inference rerank protocol:
//! `POST {base_url}/rerank` with `{query, texts}` answered by a list of
//! `{index, score}` objects in any order. The client never retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use scout_core::{Dependency, Error, Result};

use crate::oracle::{validate_scores, RerankOracle};

/// Default cross-encoder model served behind the endpoint.
pub const DEFAULT_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

/// Reranker backed by a remote cross-encoder service.
pub struct HttpReranker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpReranker {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build reranker HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/rerank", base_url.trim_end_matches('/')),
            api_key: None,
        })
    }

    /// Sends a bearer token with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The full rerank endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RerankScore {
    index: usize,
    score: f32,
}

/// Place `{index, score}` pairs back into input order.
fn order_scores(entries: Vec<RerankScore>, expected: usize) -> Result<Vec<f32>> {
    let mut slots: Vec<Option<f32>> = vec![None; expected];
    for entry in entries {
        let slot = slots.get_mut(entry.index).ok_or_else(|| {
            Error::dependency(
                Dependency::Reranker,
                format!("score index {} out of range for {expected} candidates", entry.index),
            )
        })?;
        if slot.replace(entry.score).is_some() {
            return Err(Error::dependency(
                Dependency::Reranker,
                format!("duplicate score for index {}", entry.index),
            ));
        }
    }

    let mut scores = Vec::with_capacity(expected);
    for (index, slot) in slots.into_iter().enumerate() {
        let score = slot.ok_or_else(|| {
            Error::dependency(Dependency::Reranker, format!("missing score for index {index}"))
        })?;
        scores.push(score);
    }
    validate_scores(scores, expected)
}

#[async_trait]
impl RerankOracle for HttpReranker {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let body = RerankRequest {
            query,
            texts: candidates,
            raw_scores: true,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            Error::dependency(Dependency::Reranker, format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::dependency(
                Dependency::Reranker,
                format!("HTTP {status}: {text}"),
            ));
        }

        let entries: Vec<RerankScore> = response.json().await.map_err(|e| {
            Error::dependency(Dependency::Reranker, format!("invalid response body: {e}"))
        })?;

        tracing::debug!(pool = candidates.len(), "rerank response received");
        order_scores(entries, candidates.len())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entries(pairs: &[(usize, f32)]) -> Vec<RerankScore> {
        pairs
            .iter()
            .map(|&(index, score)| RerankScore { index, score })
            .collect()
    }

    #[test]
    fn test_order_scores_restores_input_order() {
        let scores = order_scores(entries(&[(2, 0.1), (0, 0.9), (1, 0.5)]), 3).unwrap();
        assert_eq!(scores, vec![0.9, 0.5, 0.1]);
    }

    #[test]
    fn test_order_scores_rejects_missing_index() {
        let err = order_scores(entries(&[(0, 0.9)]), 2).unwrap_err();
        assert!(err.to_string().contains("missing score for index 1"));
    }

    #[test]
    fn test_order_scores_rejects_out_of_range_and_duplicates() {
        assert!(order_scores(entries(&[(0, 0.1), (5, 0.2)]), 2).is_err());
        assert!(order_scores(entries(&[(0, 0.1), (0, 0.2)]), 2).is_err());
    }

    #[test]
    fn test_order_scores_rejects_non_finite() {
        let err = order_scores(entries(&[(0, f32::INFINITY)]), 1).unwrap_err();
        assert_eq!(err.failed_dependency(), Some(Dependency::Reranker));
    }

    #[test]
    fn test_endpoint() {
        let reranker = HttpReranker::new("http://localhost:8081/", Duration::from_secs(1)).unwrap();
        assert_eq!(reranker.endpoint(), "http://localhost:8081/rerank");
        assert_eq!(reranker.name(), "http");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_dependency_error() {
        let reranker = HttpReranker::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = reranker
            .score("q", &["candidate".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.failed_dependency(), Some(Dependency::Reranker));
    }
}
