//! Feed-Harvest: a rate-limit tolerant social profile crawler
//!
//! This crate fetches the newest posts of public profiles through a pool of
//! rotating crawl sessions, deduplicates them across concurrent chunk
//! fetchers, and streams the normalized records into a single-writer JSON
//! sink. A small HTTP API serves stored posts and triggers crawls on demand.
//!
//! Callers asking for N posts may receive fewer: duplicates, a profile with a
//! shorter history, and chunks that exhaust their retry budget all reduce the
//! count without surfacing an error.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod post;
pub mod source;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Feed-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No posts could be fetched for profile '{0}'")]
    EmptyCrawl(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid profile name: {0}")]
    InvalidProfile(String),
}

/// Result type alias for Feed-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use post::{PostKind, PostRecord};
pub use state::ChunkState;
