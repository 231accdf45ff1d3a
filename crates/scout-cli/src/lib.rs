//! Command-line interface for Scout.
//!
//! Loads layered configuration (defaults, TOML file, `SCOUT_*` environment
//! variables), wires the configured backends into a
//! [`scout_search::SearchOrchestrator`] and runs one command against it.

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;

pub use app::{init_logging, ScoutApp};
pub use cli::{CacheAction, CliArgs, Command, ConfigAction, SearchArgs};
pub use config::ScoutConfig;
pub use config_handlers::handle_config_command;
