//! Storage traits and error types
//!
//! This module defines the trait interface for catalog storage backends and
//! associated error types.

use crate::catalog::{CatalogRecord, TitleType};
use crate::query::QuerySpec;
use crate::state::CrawlCursor;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt crawl cursor: {0}")]
    CorruptCursor(String),

    #[error("Corrupt record {id}: {message}")]
    CorruptRecord { id: String, message: String },

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a record upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Genres newly added to the genre index
    pub genres_added: usize,

    /// False if the record was written but the genre index update failed
    pub genre_index_synced: bool,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Total matching records, ignoring pagination
    pub count: u64,

    /// Records on this page, most popular first
    pub items: Vec<CatalogRecord>,

    /// Snapshot of the genre index, sorted
    pub genres: Vec<String>,
}

/// Trait for catalog storage backends
///
/// This is the only interface through which persisted state changes. The
/// crawl controller is the single writer of the cursor; searches only read.
pub trait CatalogStore {
    // ===== Records =====

    /// Inserts a record or replaces the record with the same identifier
    ///
    /// After the record is written its genres are merged into the genre
    /// index. A failure of that merge is reported in the outcome, not as an
    /// error, because the record itself is already stored.
    fn upsert_record(&mut self, record: &CatalogRecord) -> StorageResult<UpsertOutcome>;

    /// Gets a record by identifier
    fn get_record(&self, id: &str) -> StorageResult<Option<CatalogRecord>>;

    /// Runs a filtered, sorted and paginated search
    ///
    /// Results are ordered by popularity, then rating, both descending.
    /// Reserved control identifiers are never returned.
    fn search(&self, spec: &QuerySpec, skip: u32, limit: u32) -> StorageResult<SearchPage>;

    // ===== Genre Index =====

    /// Gets every genre ever observed
    fn genre_index(&self) -> StorageResult<BTreeSet<String>>;

    /// Adds any genre present on stored records but missing from the index
    ///
    /// Returns the number of genres added.
    fn reconcile_genre_index(&mut self) -> StorageResult<usize>;

    // ===== Crawl Cursor =====

    /// Reads the crawl cursor, if one has been stored
    fn read_cursor(&self) -> StorageResult<Option<CrawlCursor>>;

    /// Replaces the stored crawl cursor as a whole
    fn write_cursor(&mut self, cursor: &CrawlCursor) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts all catalog records
    fn count_records(&self) -> StorageResult<u64>;

    /// Counts records per title type
    fn count_records_by_type(&self) -> StorageResult<HashMap<TitleType, u64>>;
}
