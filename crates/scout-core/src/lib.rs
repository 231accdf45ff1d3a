//! Scout core: shared types, errors and query canonicalization.
//!
//! This crate provides the foundational types used across all Scout crates.
//! It has no internal Scout dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`candidate`]: Candidate profiles and stored records
//! - [`query`]: Filters, limits and normalized queries
//! - [`fingerprint`]: Cache fingerprints of normalized queries
//! - [`ranked`]: Ranked result sets and their total order

pub mod candidate;
pub mod error;
pub mod fingerprint;
pub mod query;
pub mod ranked;

// Re-export key types at crate root for convenience
pub use candidate::{CandidateProfile, CandidateRecord};
pub use error::{Dependency, Error, Result};
pub use fingerprint::Fingerprint;
pub use query::{normalize_text, NormalizedQuery, QueryLimits, SearchFilters};
pub use ranked::{rank_order, RankedCandidate, RankedResultSet};
