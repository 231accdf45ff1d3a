//! Redis cache backend.
//!
//! Writes use `SET key value PX ttl`, a single atomic command, so a reader
//! never observes a half-written entry. Prefix operations walk the keyspace
//! with `SCAN MATCH prefix* COUNT 100` rather than `KEYS`, keeping Redis
//! responsive on large keyspaces.
//!
//! Requires the `cache-redis` feature.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use scout_core::{Error, Result};

use crate::backend::CacheBackend;

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Cache backend on a Redis server.
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    /// Connect to `url` (e.g. `redis://localhost:6379/0`).
    ///
    /// The connection manager reconnects transparently after failures.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::config(format!("invalid redis url '{url}': {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(cache_error)?;
        tracing::info!(url, "connected to redis cache");
        Ok(Self { conn })
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

fn cache_error(err: redis::RedisError) -> Error {
    Error::cache(err.to_string())
}

/// Escape Redis glob metacharacters so a prefix matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async::<()>(&mut conn)
            .await
            .map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(removed > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let keys = self.scan_prefix(prefix).await?;
        let mut conn = self.conn.clone();
        let mut deleted = 0u64;
        for chunk in keys.chunks(SCAN_BATCH) {
            let removed: u64 = redis::cmd("DEL")
                .arg(chunk)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;
            deleted += removed;
        }
        Ok(deleted)
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        Ok(self.scan_prefix(prefix).await?.len() as u64)
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("search:"), "search:");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let err = RedisCacheBackend::connect("not a url").await.err();
        assert!(matches!(err, Some(Error::Config(_))));
    }
}
