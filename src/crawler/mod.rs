//! Crawler module for incremental catalog crawling
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with error classification
//! - HTML extraction of ranked candidates, title details and advisories
//! - The paced controller loop that owns the crawl cursor

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{Coordinator, CrawlSummary, CrawlTimings, CycleError, CycleOutcome};
pub use fetcher::{build_http_client, user_agent_string, FetchError, HttpFetcher, PageFetcher};
pub use parser::{ExtractionFailure, HtmlTitleSource, PageSource};

use crate::config::Config;
use crate::state::CursorPolicy;
use crate::storage::CatalogStore;
use crate::MarqueeError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Coordinator wired to the live HTML title index
pub type HtmlCoordinator<S> = Coordinator<HtmlTitleSource<HttpFetcher>, S>;

/// Builds a coordinator for the configured title index
///
/// This wires together:
/// 1. An HTTP client carrying the configured user agent
/// 2. The HTML page source for the configured base URL
/// 3. Cursor policy and timings from the crawler section
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `store` - The shared catalog store
///
/// # Returns
///
/// * `Ok(Coordinator)` - Ready to run
/// * `Err(MarqueeError)` - The HTTP client could not be built
pub fn build_coordinator<S>(
    config: &Config,
    store: Arc<Mutex<S>>,
) -> Result<HtmlCoordinator<S>, MarqueeError>
where
    S: CatalogStore + Send,
{
    let fetcher = HttpFetcher::from_config(
        &config.user_agent,
        Duration::from_secs(config.source.request_timeout),
    )?;
    let source = HtmlTitleSource::new(fetcher, &config.source);

    Ok(Coordinator::new(
        source,
        store,
        CursorPolicy::from(&config.crawler),
        CrawlTimings::from(&config.crawler),
    ))
}
