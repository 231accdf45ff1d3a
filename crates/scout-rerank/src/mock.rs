//! Mock reranker for testing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scout_core::{normalize_text, Dependency, Error, Result};

use crate::oracle::RerankOracle;

/// Deterministic reranker that scores by query-token overlap.
///
/// The score of a candidate is the fraction of distinct query tokens that
/// also appear in its text. A constant-score mode makes every candidate tie,
/// which exercises the stage-1 and id tie-breakers.
pub struct MockReranker {
    constant: Option<f32>,
    delay: Option<Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Default for MockReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReranker {
    /// Creates a token-overlap reranker.
    pub fn new() -> Self {
        Self {
            constant: None,
            delay: None,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a reranker that gives every candidate the same score.
    pub fn constant(score: f32) -> Self {
        Self {
            constant: Some(score),
            ..Self::new()
        }
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `score` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn overlap(query_tokens: &HashSet<String>, text: &str) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let text_tokens: HashSet<String> = tokens(text);
        let shared = query_tokens.intersection(&text_tokens).count();
        shared as f32 / query_tokens.len() as f32
    }
}

fn tokens(text: &str) -> HashSet<String> {
    normalize_text(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl RerankOracle for MockReranker {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::dependency(
                Dependency::Reranker,
                "mock reranker is failing",
            ));
        }

        if let Some(score) = self.constant {
            return Ok(vec![score; candidates.len()]);
        }

        let query_tokens = tokens(query);
        Ok(candidates
            .iter()
            .map(|text| Self::overlap(&query_tokens, text))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
