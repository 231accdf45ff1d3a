//! Per-request orchestration trace.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A step of the search pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fingerprint lookup in the result cache.
    CacheLookup,
    /// Query text to vector.
    Embed,
    /// Stage-1 vector + filter retrieval.
    Retrieve,
    /// Stage-2 precision scoring.
    Rerank,
    /// Writing the result to the cache.
    CacheStore,
}

impl Stage {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheLookup => "cache_lookup",
            Self::Embed => "embed",
            Self::Retrieve => "retrieve",
            Self::Rerank => "rerank",
            Self::CacheStore => "cache_store",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Which stage ran.
    pub stage: Stage,
    /// Wall time spent in it.
    pub elapsed_ms: u64,
    /// Items produced (vector length, pool size, results, ...).
    pub items: usize,
}

impl StageTiming {
    /// Record a stage run.
    pub fn new(stage: Stage, elapsed: Duration, items: usize) -> Self {
        Self {
            stage,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            items,
        }
    }
}

/// What happened while serving one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTrace {
    /// Stages executed on behalf of this request, in order.
    pub stages: Vec<StageTiming>,
    /// Whether the request awaited a computation started by another request.
    pub joined_inflight: bool,
}

impl SearchTrace {
    /// Whether `stage` ran.
    pub fn ran(&self, stage: Stage) -> bool {
        self.stages.iter().any(|s| s.stage == stage)
    }

    /// Names of the executed stages, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.stage.as_str()).collect()
    }

    /// Total time across stages.
    pub fn total_ms(&self) -> u64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_queries() {
        let trace = SearchTrace {
            stages: vec![
                StageTiming::new(Stage::CacheLookup, Duration::from_millis(2), 0),
                StageTiming::new(Stage::Embed, Duration::from_millis(30), 1536),
            ],
            joined_inflight: false,
        };
        assert!(trace.ran(Stage::Embed));
        assert!(!trace.ran(Stage::Rerank));
        assert_eq!(trace.stage_names(), vec!["cache_lookup", "embed"]);
        assert_eq!(trace.total_ms(), 32);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::CacheStore.to_string(), "cache_store");
        assert_eq!(Stage::Retrieve.to_string(), "retrieve");
    }
}
