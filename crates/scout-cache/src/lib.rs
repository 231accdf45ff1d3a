//! Search result cache for Scout.
//!
//! # Features
//!
//! - `cache-redis`: Redis backend ([`RedisCacheBackend`])
//!
//! # Modules
//!
//! - [`backend`]: `CacheBackend` trait
//! - [`memory`]: In-process backend
//! - [`metrics`]: Hit/miss counters and stats snapshots
//! - [`cache`]: `ResultCache`, the fingerprint-keyed result store

pub mod backend;
pub mod cache;
pub mod memory;
pub mod metrics;

#[cfg(feature = "cache-redis")]
pub mod redis_backend;

pub use backend::CacheBackend;
pub use cache::{CacheEnvelope, ResultCache, DEFAULT_TTL, SEARCH_NAMESPACE};
pub use memory::{MemoryCacheBackend, DEFAULT_MEMORY_CAPACITY};
pub use metrics::{CacheMetrics, CacheStats};

#[cfg(feature = "cache-redis")]
pub use redis_backend::RedisCacheBackend;
