//! Query module for catalog searches
//!
//! This module turns untrusted request parameters into a safe catalog query:
//! - Allowlist sanitization of keys and values
//! - Translation of recognized keys into a [`QuerySpec`]
//! - Pagination with a clamped page size
//!
//! The resulting response is what the HTTP layer serializes back to clients.

mod sanitize;
mod translate;

pub use sanitize::{sanitize, split_list};
pub use translate::{translate, QuerySpec, SearchRequest, MAX_LIMIT, MAX_SEARCH_TERMS};

use crate::catalog::CatalogRecord;
use crate::storage::{CatalogStore, StorageResult};
use serde::Serialize;

/// Response returned to search clients
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Total number of records matching the filter, ignoring pagination
    pub count: u64,

    /// The requested page of records
    pub items: Vec<CatalogRecord>,

    /// Every genre known to the catalog, for client-side filter menus
    pub tags: Vec<String>,

    /// The effective page size after clamping
    pub limit: u32,
}

/// Translates parameters and runs the resulting search
///
/// # Example
///
/// ```no_run
/// use marquee::query::search_catalog;
/// use marquee::storage::SqliteStorage;
///
/// let storage = SqliteStorage::new_in_memory().unwrap();
/// let response = search_catalog(&storage, [("genre", "drama"), ("limit", "10")]).unwrap();
/// println!("{} matching titles", response.count);
/// ```
pub fn search_catalog<S, I, K, V>(store: &S, params: I) -> StorageResult<SearchResponse>
where
    S: CatalogStore + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let request = translate(params);
    tracing::debug!(
        "Searching catalog: {:?} (skip {}, limit {})",
        request.spec,
        request.skip,
        request.limit
    );

    let page = store.search(&request.spec, request.skip, request.limit)?;

    Ok(SearchResponse {
        count: page.count,
        items: page.items,
        tags: page.genres,
        limit: request.limit,
    })
}
