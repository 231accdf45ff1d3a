//! In-process cache backend.
//!
//! Entries live in a bounded LRU map: once `capacity` keys are held, a write
//! evicts the least recently used one. Deadlines use `tokio::time::Instant`,
//! so tests running with a paused clock can advance past a TTL
//! deterministically. Expired entries are invisible to readers and dropped
//! when a read or a prefix operation touches them.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;

use scout_core::{Error, Result};

use crate::backend::CacheBackend;

/// Default number of entries held by [`MemoryCacheBackend::new`].
pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache backend holding entries in a bounded LRU map.
pub struct MemoryCacheBackend {
    entries: Mutex<LruCache<String, Slot>>,
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheBackend {
    /// Create an empty backend holding up to [`DEFAULT_MEMORY_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }

    /// Create an empty backend holding up to `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Maximum number of entries held.
    pub fn capacity(&self) -> usize {
        self.lock().map_or(0, |entries| entries.cap().get())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<String, Slot>>> {
        self.entries
            .lock()
            .map_err(|_| Error::cache("memory cache lock poisoned"))
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let hit = entries
            .get(key)
            .map(|slot| slot.is_live(now).then(|| slot.value.clone()));
        match hit {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let slot = Slot {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock()?.put(key.to_string(), slot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let removed = self.lock()?.pop(key);
        Ok(removed.is_some_and(|slot| slot.is_live(now)))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let keys: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if entries.pop(&key).is_some_and(|slot| slot.is_live(now)) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        let now = Instant::now();
        let entries = self.lock()?;
        Ok(entries
            .iter()
            .filter(|(key, slot)| key.starts_with(prefix) && slot.is_live(now))
            .count() as u64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_raw("search:a", b"one".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get_raw("search:a").await.unwrap(), Some(b"one".to_vec()));

        assert!(backend.delete("search:a").await.unwrap());
        assert!(!backend.delete("search:a").await.unwrap());
        assert_eq!(backend.get_raw("search:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let backend = MemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set_raw("k", b"first".to_vec(), ttl).await.unwrap();
        backend.set_raw("k", b"second".to_vec(), ttl).await.unwrap();
        assert_eq!(backend.get_raw("k").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_raw("k", b"v".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(backend.get_raw("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(backend.get_raw("k").await.unwrap().is_none());
        assert_eq!(backend.count_prefix("").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prefix_operations() {
        let backend = MemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set_raw("search:1", vec![1], ttl).await.unwrap();
        backend.set_raw("search:2", vec![2], ttl).await.unwrap();
        backend.set_raw("other:1", vec![3], ttl).await.unwrap();

        assert_eq!(backend.count_prefix("search:").await.unwrap(), 2);
        assert_eq!(backend.delete_prefix("search:").await.unwrap(), 2);
        assert_eq!(backend.count_prefix("search:").await.unwrap(), 0);
        assert_eq!(backend.count_prefix("other:").await.unwrap(), 1);
        assert_eq!(backend.delete_prefix("search:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used_at_capacity() {
        let backend = MemoryCacheBackend::with_capacity(2);
        let ttl = Duration::from_secs(60);
        backend.set_raw("search:a", vec![1], ttl).await.unwrap();
        backend.set_raw("search:b", vec![2], ttl).await.unwrap();

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(backend.get_raw("search:a").await.unwrap().is_some());
        backend.set_raw("search:c", vec![3], ttl).await.unwrap();

        assert_eq!(backend.count_prefix("search:").await.unwrap(), 2);
        assert!(backend.get_raw("search:a").await.unwrap().is_some());
        assert!(backend.get_raw("search:b").await.unwrap().is_none());
        assert!(backend.get_raw("search:c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_many_distinct_writes_stay_bounded() {
        let backend = MemoryCacheBackend::with_capacity(100);
        let ttl = Duration::from_secs(3600);
        for i in 0..5_000 {
            backend
                .set_raw(&format!("search:{i}"), vec![0], ttl)
                .await
                .unwrap();
        }
        assert_eq!(backend.count_prefix("search:").await.unwrap(), 100);
        assert!(backend.get_raw("search:4999").await.unwrap().is_some());
        assert!(backend.get_raw("search:0").await.unwrap().is_none());
    }

    #[test]
    fn test_capacity() {
        assert_eq!(MemoryCacheBackend::new().capacity(), DEFAULT_MEMORY_CAPACITY);
        assert_eq!(MemoryCacheBackend::with_capacity(0).capacity(), 1);
    }
}
