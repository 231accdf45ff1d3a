//! Candidate store and embedding providers for Scout.
//!
//! Stage-1 retrieval lives here: a [`CandidateStore`] answers combined
//! similarity + predicate queries, and an [`EmbeddingProvider`] turns query
//! text into the vector those queries rank by.
//!
//! # Features
//!
//! - `store-pgvector`: Postgres + pgvector backend ([`PgVectorStore`])
//!
//! # Modules
//!
//! - [`embedding`]: `EmbeddingProvider` trait and deterministic mock
//! - [`openai`]: OpenAI-compatible embeddings client
//! - [`store`]: `CandidateStore` trait and query types
//! - [`memory`]: Exhaustive in-memory store
//! - [`loader`]: JSON candidate loading and ingestion

pub mod embedding;
pub mod loader;
pub mod memory;
pub mod openai;
pub mod store;

#[cfg(feature = "store-pgvector")]
pub mod postgres;

pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};
pub use loader::{ingest, load_candidates, profile_embedding_text};
pub use memory::MemoryCandidateStore;
pub use openai::OpenAiEmbeddingProvider;
pub use store::{cosine_similarity, CandidateStore, StoreHit, StoreQuery};

#[cfg(feature = "store-pgvector")]
pub use postgres::PgVectorStore;
