//! Storage module for persisting the catalog
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Record upserts and genre membership
//! - The append-only genre index
//! - The single-row crawl cursor
//! - Filtered, paginated searches

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{CatalogStore, SearchPage, StorageError, StorageResult, UpsertOutcome};

use crate::MarqueeError;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(MarqueeError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, MarqueeError> {
    SqliteStorage::new(path)
}

/// Locks a shared store, mapping a poisoned lock to a storage error
pub fn lock_store<S: ?Sized>(store: &Mutex<S>) -> StorageResult<MutexGuard<'_, S>> {
    store.lock().map_err(|_| StorageError::Poisoned)
}
