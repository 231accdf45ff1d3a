//! Configuration for the Scout CLI and server.
//!
//! Provides [`ScoutConfig`], loaded from TOML files, environment variables,
//! and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `SCOUT_CONFIG` environment variable
//! 3. XDG default: `~/.config/scout/config.toml`
//! 4. Built-in defaults
//!
//! `SCOUT_<SECTION>_<KEY>` environment variables overlay the file.

use std::path::PathBuf;
use std::time::Duration;

use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};

use scout_core::{Error, QueryLimits, Result};
use scout_search::{SearchSettings, OVER_FETCH_FACTOR};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "SCOUT";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// HTTP server.
    pub server: ServerConfig,
    /// Pipeline tuning.
    pub search: SearchConfig,
    /// Query embedding provider.
    pub embedding: EmbeddingConfig,
    /// Reranking oracle.
    pub rerank: RerankConfig,
    /// Candidate store.
    pub store: StoreConfig,
    /// Result cache.
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Key required by the admin cache endpoints. Unset disables them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result cache TTL in seconds; 0 disables caching.
    pub cache_ttl_secs: u64,

    /// Stage-1 pool size as a multiple of top_k.
    pub over_fetch: usize,

    /// Result count when a request does not name one.
    pub default_top_k: usize,

    /// Largest result count a request may ask for.
    pub max_top_k: usize,

    /// Embedding call timeout.
    pub embed_timeout_ms: u64,

    /// Candidate store call timeout.
    pub store_timeout_ms: u64,

    /// Rerank call timeout.
    pub rerank_timeout_ms: u64,
}

/// Which embedding provider to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    /// Deterministic local vectors.
    #[default]
    Mock,
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider kind.
    pub provider: EmbeddingKind,

    /// Model name.
    pub model: String,

    /// API root.
    pub base_url: String,

    /// Bearer token; falls back to `OPENAI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vector length shared by the provider and the store.
    pub dimension: usize,
}

/// Which reranking oracle to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankKind {
    /// Token-overlap scorer.
    #[default]
    Mock,
    /// Cross-encoder behind a `/rerank` endpoint.
    Http,
}

/// Reranking oracle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Oracle kind.
    pub provider: RerankKind,

    /// Base URL of the rerank service.
    pub base_url: String,

    /// Optional bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Which candidate store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process store.
    #[default]
    Memory,
    /// PostgreSQL with pgvector.
    PgVector,
}

/// Candidate store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store kind.
    pub backend: StoreKind,

    /// Candidates loaded into the memory store at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_file: Option<String>,

    /// Postgres connection string; falls back to `DATABASE_URL`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Candidate table.
    pub table: String,
}

/// Which cache backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// In-process map.
    #[default]
    Memory,
    /// Shared Redis.
    Redis,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend kind.
    pub backend: CacheKind,

    /// Redis connection URL.
    pub redis_url: String,

    /// Key namespace.
    pub namespace: String,

    /// Maximum entries held by the memory backend.
    pub capacity: usize,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admin_key: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            cache_ttl_secs: 3600,
            over_fetch: OVER_FETCH_FACTOR,
            default_top_k: limits.default_top_k,
            max_top_k: limits.max_top_k,
            embed_timeout_ms: 5_000,
            store_timeout_ms: 5_000,
            rerank_timeout_ms: 10_000,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingKind::default(),
            model: scout_store::openai::DEFAULT_MODEL.to_string(),
            base_url: scout_store::openai::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            dimension: 1536,
        }
    }
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: RerankKind::default(),
            base_url: "http://127.0.0.1:8787".to_string(),
            api_key: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreKind::default(),
            candidates_file: None,
            database_url: None,
            table: "candidates".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheKind::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            namespace: scout_cache::SEARCH_NAMESPACE.to_string(),
            capacity: scout_cache::DEFAULT_MEMORY_CAPACITY,
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl ScoutConfig {
    /// Load configuration: defaults overlaid by the file, then `SCOUT_*` env.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level(ENV_PREFIX);
        for section in ["server", "search", "embedding", "rerank", "store", "cache"] {
            env_opts.add_section(section);
        }
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        tracing::debug!(
            store = ?config.store.backend,
            cache = ?config.cache.backend,
            embedding = ?config.embedding.provider,
            rerank = ?config.rerank.provider,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("SCOUT_CONFIG") {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("scout").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into environment variable pairs with `SCOUT_` prefix.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value: toml::Value =
            toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_toml_value(&value, ENV_PREFIX, &mut vars);
        Ok(vars)
    }

    /// Pipeline settings derived from the `[search]` section.
    pub fn search_settings(&self) -> SearchSettings {
        let search = &self.search;
        SearchSettings::default()
            .with_cache_ttl(Duration::from_secs(search.cache_ttl_secs))
            .with_over_fetch(search.over_fetch)
            .with_limits(QueryLimits {
                default_top_k: search.default_top_k.max(1),
                max_top_k: search.max_top_k.max(1),
            })
            .with_timeouts(
                Duration::from_millis(search.embed_timeout_ms.max(1)),
                Duration::from_millis(search.store_timeout_ms.max(1)),
                Duration::from_millis(search.rerank_timeout_ms.max(1)),
            )
    }
}

// ============================================================================
// Helper: flatten TOML to env vars
// ============================================================================

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let env_key = format!("{}_{}", prefix, key.to_uppercase());
                flatten_toml_value(val, &env_key, out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
