use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Marquee
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Crawl pacing and cursor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Time to wait before every cycle (seconds)
    #[serde(rename = "pacing-interval", default = "default_pacing_interval")]
    pub pacing_interval: u64,

    /// Time to wait for each backoff cycle (seconds)
    #[serde(rename = "backoff-interval", default = "default_backoff_interval")]
    pub backoff_interval: u64,

    /// Extra wait when no cursor has been stored yet (seconds)
    #[serde(rename = "cold-start-delay", default = "default_pacing_interval")]
    pub cold_start_delay: u64,

    /// Highest rank position crawled before switching partitions
    #[serde(rename = "position-ceiling", default = "default_position_ceiling")]
    pub position_ceiling: u32,

    /// Backoff cycles seeded when switching into the film partition
    #[serde(rename = "film-seed-backoff", default = "default_film_seed_backoff")]
    pub film_seed_backoff: u32,

    /// Backoff cycles seeded when switching into the game partition
    #[serde(rename = "game-seed-backoff", default)]
    pub game_seed_backoff: u32,
}

impl CrawlerConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_interval)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_interval)
    }

    pub fn cold_start(&self) -> Duration {
        Duration::from_secs(self.cold_start_delay)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            pacing_interval: default_pacing_interval(),
            backoff_interval: default_backoff_interval(),
            cold_start_delay: default_pacing_interval(),
            position_ceiling: default_position_ceiling(),
            film_seed_backoff: default_film_seed_backoff(),
            game_seed_backoff: 0,
        }
    }
}

fn default_pacing_interval() -> u64 {
    10 * 60
}

fn default_backoff_interval() -> u64 {
    12 * 60 * 60
}

fn default_position_ceiling() -> u32 {
    4444
}

fn default_film_seed_backoff() -> u32 {
    30
}

/// Ranked title index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the title index (e.g. "https://www.imdb.com")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Lowest user rating included in the ranking
    #[serde(rename = "min-user-rating", default = "default_min_user_rating")]
    pub min_user_rating: String,

    /// Minimum vote count for the film partition
    #[serde(rename = "film-min-votes", default = "default_film_min_votes")]
    pub film_min_votes: u64,

    /// Minimum vote count for the game partition
    #[serde(rename = "game-min-votes", default = "default_game_min_votes")]
    pub game_min_votes: u64,

    /// Total request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_min_user_rating() -> String {
    "6.7".to_string()
}

fn default_film_min_votes() -> u64 {
    100_000
}

fn default_game_min_votes() -> u64 {
    1_000
}

fn default_request_timeout() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Catalog storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
