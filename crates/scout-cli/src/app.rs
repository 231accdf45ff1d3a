//! The Scout CLI application.
//!
//! Turns a [`ScoutConfig`] into live components (embedder, store, reranker,
//! cache) and dispatches CLI commands against them.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use scout_api::{AppState, ServerConfig};
use scout_cache::{CacheBackend, CacheMetrics, MemoryCacheBackend, ResultCache};
use scout_core::{Error, Result, SearchFilters};
use scout_rerank::{HttpReranker, MockReranker, RerankOracle};
use scout_search::{SearchOrchestrator, SearchOutcome};
use scout_store::{
    ingest, load_candidates, CandidateStore, EmbeddingProvider, MemoryCandidateStore,
    MockEmbeddingProvider, OpenAiEmbeddingProvider,
};

use crate::cli::{CacheAction, CliArgs, Command, SearchArgs};
use crate::config::{CacheKind, EmbeddingKind, RerankKind, ScoutConfig, StoreKind};
use crate::config_handlers;

/// Initialise tracing-based logging.
///
/// Uses `RUST_LOG` if set, otherwise defaults based on verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Ignore error if a subscriber is already set (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// ScoutApp
// ============================================================================

/// A configured Scout process.
pub struct ScoutApp {
    config: ScoutConfig,
    config_path: Option<String>,
    version: String,
}

impl ScoutApp {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = ScoutConfig::load(args.config.as_deref())?;
        Ok(Self::new(config).with_config_path(args.config.clone()))
    }

    /// Create an application around a loaded config.
    pub fn new(config: ScoutConfig) -> Self {
        Self {
            config,
            config_path: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Remember the `--config` path for `config` subcommands.
    pub fn with_config_path(mut self, path: Option<String>) -> Self {
        self.config_path = path;
        self
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Run one command.
    pub async fn run(&self, command: Option<Command>) -> Result<()> {
        match command {
            Some(Command::Version) => {
                println!("scout {}", self.version);
                Ok(())
            }
            Some(Command::Serve { port }) => self.serve(port).await,
            Some(Command::Search(args)) => self.search(args).await,
            Some(Command::Ingest { file }) => self.ingest_file(Path::new(&file)).await,
            Some(Command::Cache(cmd)) => self.cache(cmd.command).await,
            Some(Command::Config(cmd)) => {
                config_handlers::handle_config_command(self.config_path.as_deref(), cmd.command)
            }
            None => {
                println!("scout {}: use --help for usage", self.version);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn serve(&self, port: Option<u16>) -> Result<()> {
        let mut server = ServerConfig::new(self.bind_addr()?);
        if let Some(port) = port {
            server = server.with_port(port);
        }

        let mut state = AppState::new(self.build_orchestrator().await?);
        match self.config.server.admin_key.as_deref() {
            Some(key) if !key.is_empty() => state = state.with_admin_key(key),
            _ => tracing::warn!("server.admin_key is not set; cache endpoints are disabled"),
        }
        scout_api::serve(server, state).await
    }

    async fn search(&self, args: SearchArgs) -> Result<()> {
        let orchestrator = self.build_orchestrator().await?;
        let filters = search_filters(&args);
        let outcome = orchestrator.search(&args.query, &filters, args.top_k).await?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print!("{}", render_outcome(&outcome));
        }
        Ok(())
    }

    async fn ingest_file(&self, path: &Path) -> Result<()> {
        let embedder = self.build_embedder()?;
        let store = self.build_store(embedder.as_ref()).await?;
        let records = load_candidates(path).await?;
        let written = ingest(store.as_ref(), Some(embedder.as_ref()), records).await?;
        println!("Ingested {written} candidates into {} store", store.name());
        Ok(())
    }

    async fn cache(&self, action: CacheAction) -> Result<()> {
        if self.config.cache.backend == CacheKind::Memory {
            return Err(Error::config(
                "cache commands need a shared backend; the memory cache lives inside \
                 `scout serve` (use the /cache endpoints or cache.backend = \"redis\")",
            ));
        }
        let cache = self.build_cache().await?;
        match action {
            CacheAction::Stats => {
                let stats = cache.stats().await?;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            CacheAction::Invalidate => {
                let deleted = cache.invalidate_all().await?;
                println!("Deleted {deleted} cached results");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Component wiring
    // ------------------------------------------------------------------------

    /// Address from the `[server]` section.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let server = &self.config.server;
        format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| {
                Error::config(format!(
                    "invalid server address {}:{}: {e}",
                    server.host, server.port
                ))
            })
    }

    /// Assemble the full search pipeline.
    pub async fn build_orchestrator(&self) -> Result<SearchOrchestrator> {
        let embedder = self.build_embedder()?;
        let store = self.build_store(embedder.as_ref()).await?;
        let reranker = self.build_reranker()?;
        let cache = self.build_cache().await?;
        Ok(SearchOrchestrator::new(
            embedder,
            store,
            reranker,
            cache,
            self.config.search_settings(),
        ))
    }

    /// Build the configured embedding provider.
    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let config = &self.config.embedding;
        match config.provider {
            EmbeddingKind::Mock => Ok(Arc::new(MockEmbeddingProvider::new(config.dimension))),
            EmbeddingKind::OpenAi => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .unwrap_or_default();
                let timeout = Duration::from_millis(self.config.search.embed_timeout_ms.max(1));
                let mut provider = OpenAiEmbeddingProvider::new(
                    &api_key,
                    &config.base_url,
                    config.model.clone(),
                    config.dimension,
                    timeout,
                )?;
                if config.model.starts_with("text-embedding-3") {
                    provider = provider.with_requested_dimensions();
                }
                Ok(Arc::new(provider))
            }
        }
    }

    /// Build the configured reranking oracle.
    pub fn build_reranker(&self) -> Result<Arc<dyn RerankOracle>> {
        let config = &self.config.rerank;
        match config.provider {
            RerankKind::Mock => Ok(Arc::new(MockReranker::new())),
            RerankKind::Http => {
                let timeout = Duration::from_millis(self.config.search.rerank_timeout_ms.max(1));
                let mut reranker = HttpReranker::new(&config.base_url, timeout)?;
                if let Some(key) = &config.api_key {
                    reranker = reranker.with_api_key(key.clone());
                }
                Ok(Arc::new(reranker))
            }
        }
    }

    /// Build the configured candidate store. The memory store is seeded from
    /// `store.candidates_file` when one is set.
    pub async fn build_store(
        &self,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Arc<dyn CandidateStore>> {
        let config = &self.config.store;
        let dimension = self.config.embedding.dimension;
        match config.backend {
            StoreKind::Memory => {
                let store = Arc::new(MemoryCandidateStore::new(dimension));
                if let Some(file) = &config.candidates_file {
                    let records = load_candidates(Path::new(file)).await?;
                    ingest(store.as_ref(), Some(embedder), records).await?;
                }
                Ok(store)
            }
            StoreKind::PgVector => {
                let url = config
                    .database_url
                    .clone()
                    .or_else(|| std::env::var("DATABASE_URL").ok())
                    .ok_or_else(|| Error::config("store.database_url is not set"))?;
                connect_pgvector(&url, &config.table, dimension).await
            }
        }
    }

    /// Build the result cache over the configured backend.
    pub async fn build_cache(&self) -> Result<ResultCache> {
        let config = &self.config.cache;
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheKind::Memory => Arc::new(MemoryCacheBackend::with_capacity(config.capacity)),
            CacheKind::Redis => connect_redis(&config.redis_url).await?,
        };
        Ok(ResultCache::new(backend, Arc::new(CacheMetrics::new()))
            .with_namespace(&config.namespace))
    }
}

#[cfg(feature = "store-pgvector")]
async fn connect_pgvector(
    url: &str,
    table: &str,
    dimension: usize,
) -> Result<Arc<dyn CandidateStore>> {
    let store = scout_store::PgVectorStore::connect(url, table, dimension).await?;
    store.ensure_schema().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "store-pgvector"))]
async fn connect_pgvector(
    _url: &str,
    _table: &str,
    _dimension: usize,
) -> Result<Arc<dyn CandidateStore>> {
    Err(Error::config(
        "store.backend = \"pgvector\" requires building with the store-pgvector feature",
    ))
}

#[cfg(feature = "cache-redis")]
async fn connect_redis(url: &str) -> Result<Arc<dyn CacheBackend>> {
    Ok(Arc::new(scout_cache::RedisCacheBackend::connect(url).await?))
}

#[cfg(not(feature = "cache-redis"))]
async fn connect_redis(_url: &str) -> Result<Arc<dyn CacheBackend>> {
    Err(Error::config(
        "cache.backend = \"redis\" requires building with the cache-redis feature",
    ))
}

// ============================================================================
// Output helpers
// ============================================================================

fn search_filters(args: &SearchArgs) -> SearchFilters {
    let mut filters = SearchFilters::new();
    if let Some(location) = &args.location {
        filters = filters.with_location(location.clone());
    }
    if let Some(years) = args.min_experience {
        filters = filters.with_min_experience(years);
    }
    for skill in &args.skills {
        filters = filters.with_skill(skill.clone());
    }
    filters
}

fn render_outcome(outcome: &SearchOutcome) -> String {
    if outcome.results.is_empty() {
        return "No matching candidates.\n".to_string();
    }

    let mut out = String::new();
    for (rank, item) in outcome.results.items.iter().enumerate() {
        let profile = &item.profile;
        out.push_str(&format!(
            "{:>2}. {:.3}  {} | {} | {} | {}y\n",
            rank + 1,
            item.stage2_score,
            profile.full_name,
            profile.professional_title.as_deref().unwrap_or("-"),
            if profile.location.is_empty() { "-" } else { profile.location.as_str() },
            profile.years_experience,
        ));
    }
    let total_ms: u64 = outcome.trace.total_ms();
    out.push_str(&format!(
        "{} result(s){} in {total_ms}ms\n",
        outcome.results.len(),
        if outcome.cached { " (cached)" } else { "" },
    ));
    out
}

// ============================================================================
// Tests
// ============================================================================
