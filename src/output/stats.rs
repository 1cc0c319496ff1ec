//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer.

use crate::catalog::TitleType;
use crate::state::CrawlCursor;
use crate::storage::CatalogStore;
use crate::MarqueeError;
use std::collections::HashMap;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Total number of stored titles
    pub total_titles: u64,

    /// Count of titles by type
    pub titles_by_type: HashMap<TitleType, u64>,

    /// Every genre in the genre index, sorted
    pub genres: Vec<String>,

    /// Where the crawl will resume, if it has started
    pub cursor: Option<CrawlCursor>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(MarqueeError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn CatalogStore) -> Result<CatalogStatistics, MarqueeError> {
    Ok(CatalogStatistics {
        total_titles: storage.count_records()?,
        titles_by_type: storage.count_records_by_type()?,
        genres: storage.genre_index()?.into_iter().collect(),
        cursor: storage.read_cursor()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total titles: {}", stats.total_titles);
    println!("  Known genres: {}", stats.genres.len());
    println!();

    println!("Titles by Type:");
    // Sort types by count (descending)
    let mut type_counts: Vec<_> = stats.titles_by_type.iter().collect();
    type_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));

    for (kind, count) in type_counts {
        let percentage = if stats.total_titles > 0 {
            (*count as f64 / stats.total_titles as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
    println!();

    if !stats.genres.is_empty() {
        println!("Genres:");
        println!("  {}", stats.genres.join(", "));
        println!();
    }

    match &stats.cursor {
        Some(cursor) => println!("Crawl cursor: {}", cursor),
        None => println!("Crawl cursor: not started"),
    }
}
