//! Configuration module for Marquee
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use marquee::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will wait {}s between cycles", config.crawler.pacing_interval);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, SourceConfig, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_with_hash};
