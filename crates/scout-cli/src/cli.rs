//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "scout", author, version, about = "Two-stage candidate search", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "SCOUT_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server.
    Serve {
        /// Port to listen on (overrides `server.port`).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one search and print the ranked candidates.
    Search(SearchArgs),

    /// Load a JSON array of candidate records into the configured store.
    Ingest {
        /// Path to the candidates file.
        file: String,
    },

    /// Result cache operations.
    Cache(CacheCommand),

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Arguments of `scout search`.
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Free-text query.
    pub query: String,

    /// Required location.
    #[arg(short, long)]
    pub location: Option<String>,

    /// Minimum years of experience.
    #[arg(short = 'e', long)]
    pub min_experience: Option<u32>,

    /// Required skill; repeat for several.
    #[arg(short, long = "skill")]
    pub skills: Vec<String>,

    /// Number of results.
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Print the raw outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Cache-specific subcommands.
#[derive(Parser, Debug)]
pub struct CacheCommand {
    /// Cache subcommand to execute.
    #[command(subcommand)]
    pub command: CacheAction,
}

/// Available cache subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Show cache counters and entry count.
    Stats,
    /// Drop every cached search result.
    Invalidate,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "search.cache_ttl_secs").
        key: String,
    },

    /// Set a configuration value by dotted key.
    Set {
        /// Dotted key (e.g., "server.port").
        key: String,

        /// Value to set.
        value: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Export configuration as environment variables.
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
