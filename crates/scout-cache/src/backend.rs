//! Key-value backends for the result cache.
//!
//! A backend stores opaque bytes under string keys with a per-entry TTL.
//! Every write must be a single atomic operation: a reader sees either the
//! previous value or the complete new one.

use std::time::Duration;

use async_trait::async_trait;
use scout_core::Result;

/// Trait for cache storage backends.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read a live value.
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value that expires after `ttl`, replacing any previous one.
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove one key. Returns whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every key starting with `prefix`. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Count live keys starting with `prefix`.
    async fn count_prefix(&self, prefix: &str) -> Result<u64>;

    /// The backend name for diagnostics.
    fn name(&self) -> &str;
}
