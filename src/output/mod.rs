//! Output module for reporting on the catalog
//!
//! This module handles:
//! - Loading catalog statistics
//! - Printing statistics and search results for the command line

pub mod stats;

pub use stats::{load_statistics, print_statistics, CatalogStatistics};

use crate::query::SearchResponse;
use crate::MarqueeError;

/// Renders a search response as pretty-printed JSON
pub fn render_search_response(response: &SearchResponse) -> Result<String, MarqueeError> {
    Ok(serde_json::to_string_pretty(response)?)
}
