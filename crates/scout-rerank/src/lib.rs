//! Reranking oracle integration for Scout.
//!
//! Stage 2 of the search pipeline: a [`RerankOracle`] scores the over-fetched
//! stage-1 pool against the query text, and [`candidate_text`] decides what
//! the oracle reads for each candidate.

pub mod http;
pub mod mock;
pub mod oracle;

pub use http::HttpReranker;
pub use mock::MockReranker;
pub use oracle::{candidate_text, validate_scores, RerankOracle};
