//! HTTP API for Scout.
//!
//! A thin axum layer over [`scout_search::SearchOrchestrator`]:
//!
//! - `POST /search`: run a search
//! - `GET /cache/stats`: cache counters (admin)
//! - `POST /cache/invalidate`: drop every cached result (admin)
//! - `GET /health`: liveness and backend names
//!
//! Admin endpoints require an `X-API-Key` header matching the configured key.

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

pub use auth::{AdminKey, API_KEY_HEADER};
pub use error::{ApiError, ErrorBody};
pub use routes::{router, AppState, SearchRequest, SearchResponse};
pub use server::{serve, serve_with_shutdown, ServerConfig};
