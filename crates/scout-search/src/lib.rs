//! Two-stage candidate search for Scout.
//!
//! A request is normalized and fingerprinted, answered from the result cache
//! when possible, and otherwise run through embed → retrieve (vector
//! similarity with exact filters, over-fetched) → rerank (precision scoring)
//! before being cached.
//!
//! # Modules
//!
//! - [`orchestrator`]: `SearchOrchestrator`, the entry point
//! - [`stage`]: Typed pipeline stages with per-dependency timeouts
//! - [`inflight`]: De-duplication of concurrent identical misses
//! - [`settings`]: Pool sizing, TTL and timeouts
//! - [`trace`]: Per-request stage timings

pub mod inflight;
pub mod orchestrator;
pub mod settings;
pub mod stage;
pub mod trace;

pub use orchestrator::{SearchOrchestrator, SearchOutcome};
pub use settings::{SearchSettings, MAX_POOL_SIZE, OVER_FETCH_FACTOR};
pub use stage::PipelineStage;
pub use trace::{SearchTrace, Stage, StageTiming};
