//! Error types for Scout operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Scout crates. Uses `thiserror` for derive macros.
//!
//! The taxonomy separates caller mistakes (`InvalidQuery`, `InvalidFilter`),
//! failing collaborators (`DependencyUnavailable`) and cache anomalies
//! (`CacheReadCorrupt`, `Cache`). Only the first two ever reach a caller of
//! the search pipeline; cache anomalies are absorbed by the cache layer.
//!
//! `Error` is `Clone`: a single failed pipeline run may be observed by several
//! requests waiting on the same in-flight computation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External collaborator that a pipeline stage depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// Text-to-vector embedding service.
    Embedding,
    /// Candidate store (vector + predicate query).
    Store,
    /// Precision reranking model.
    Reranker,
}

impl Dependency {
    /// Stable lowercase name used in logs and error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Store => "store",
            Self::Reranker => "reranker",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in Scout operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Query text is missing or empty after trimming.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A filter has an unknown key or a value of the wrong type.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// An external dependency failed or timed out.
    #[error("Dependency unavailable ({dependency}): {reason}")]
    DependencyUnavailable {
        /// Which collaborator failed.
        dependency: Dependency,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A cache entry could not be decoded.
    #[error("Corrupt cache entry: {0}")]
    CacheReadCorrupt(String),

    /// The cache backend itself failed (connection, protocol).
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an invalid query error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    /// Create a dependency failure for the given collaborator.
    pub fn dependency(dependency: Dependency, reason: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            dependency,
            reason: reason.into(),
        }
    }

    /// Create a corrupt cache entry error.
    pub fn cache_corrupt(msg: impl Into<String>) -> Self {
        Self::CacheReadCorrupt(msg.into())
    }

    /// Create a cache backend error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Wrap an I/O error together with the path it concerns.
    pub fn io_with_path(err: std::io::Error, path: &Path) -> Self {
        Self::Io(format!("{}: {err}", path.display()))
    }

    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable { .. })
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidQuery(_) | Self::InvalidFilter(_))
    }

    /// The failing dependency, if this is a dependency failure.
    pub fn failed_dependency(&self) -> Option<Dependency> {
        match self {
            Self::DependencyUnavailable { dependency, .. } => Some(*dependency),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Scout's Error type.
pub type Result<T> = std::result::Result<T, Error>;
