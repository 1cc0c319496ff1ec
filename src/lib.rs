//! Marquee: an incremental title-catalog crawler
//!
//! This crate walks a ranked public title index one position at a time,
//! normalizes each title into a catalog record and stores it, then serves
//! filtered, paginated searches over the stored catalog.
//!
//! Only one crawl loop may run against a database at a time. The loop is the
//! sole writer of the crawl cursor; searches only read.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Marquee operations
#[derive(Debug, Error)]
pub enum MarqueeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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
}

/// Result type alias for Marquee operations
pub type Result<T> = std::result::Result<T, MarqueeError>;

// Re-export commonly used types
pub use catalog::{CatalogRecord, TitleType};
pub use config::Config;
pub use query::{search_catalog, SearchResponse};
pub use state::{CrawlCursor, Partition};
pub use storage::{CatalogStore, SqliteStorage};
