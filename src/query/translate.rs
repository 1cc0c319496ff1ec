//! Translation of request parameters into a catalog query
//!
//! The translator never fails. Parameters it cannot use are dropped so that a
//! malformed request still returns the default listing.

use crate::catalog::{is_reserved_id, AdvisoryCategory, CatalogRecord, TitleType};
use crate::query::sanitize::{sanitize, split_list, LIST_SEPARATOR};
use std::collections::BTreeMap;

/// Largest page a single search may return
pub const MAX_LIMIT: u32 = 50;

/// Maximum number of title search terms honoured
pub const MAX_SEARCH_TERMS: usize = 10;

/// Structured catalog filter built from request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Exact title type to match
    pub kind: String,

    /// Genres a record must all carry
    pub all_genres: Vec<String>,

    /// Genres a record must not carry
    pub excluded_genres: Vec<String>,

    /// Upper bounds on advisory severities
    pub ceilings: Vec<(AdvisoryCategory, u8)>,

    /// Case-insensitive title substrings, all required
    pub title_terms: Vec<String>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            kind: TitleType::Film.to_db_string().to_string(),
            all_genres: Vec::new(),
            excluded_genres: Vec::new(),
            ceilings: Vec::new(),
            title_terms: Vec::new(),
        }
    }
}

impl QuerySpec {
    /// Evaluates the filter against a single record
    ///
    /// Reserved control identifiers never match.
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        if is_reserved_id(&record.id) {
            return false;
        }

        if record.kind.to_db_string() != self.kind {
            return false;
        }

        if !self.all_genres.iter().all(|g| record.genres.contains(g)) {
            return false;
        }

        if self.excluded_genres.iter().any(|g| record.genres.contains(g)) {
            return false;
        }

        if self
            .ceilings
            .iter()
            .any(|(category, ceiling)| record.advisory.get(*category) > *ceiling)
        {
            return false;
        }

        let title = record.title.to_lowercase();
        self.title_terms
            .iter()
            .all(|term| title.contains(&term.to_lowercase()))
    }
}

/// A translated search: filter plus pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub spec: QuerySpec,
    pub skip: u32,
    pub limit: u32,
}

/// Builds a search request from raw key/value parameters
///
/// Keys and values are sanitized first. Empty values and values starting with
/// the list separator are ignored, as are unrecognized keys. When a key
/// appears more than once the last value wins.
pub fn translate<I, K, V>(params: I) -> SearchRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sanitized: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (sanitize(k.as_ref()), sanitize(v.as_ref())))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty() && !v.starts_with(LIST_SEPARATOR))
        .collect();

    let mut spec = QuerySpec::default();
    let mut skip = 0;
    let mut limit = MAX_LIMIT;

    for (key, value) in &sanitized {
        match key.as_str() {
            "type" => spec.kind = value.to_lowercase(),
            "genre" => spec.all_genres = lowercase_list(value),
            "notgenre" => spec.excluded_genres = lowercase_list(value),
            "search" => {
                spec.title_terms = split_list(value)
                    .take(MAX_SEARCH_TERMS)
                    .map(str::to_string)
                    .collect()
            }
            "skip" => skip = value.parse().unwrap_or(0),
            "limit" => limit = clamp_limit(value),
            other => {
                if let Some(category) = AdvisoryCategory::from_key(other) {
                    if let Ok(ceiling) = value.parse::<u8>() {
                        spec.ceilings.push((category, ceiling));
                    }
                } else {
                    tracing::debug!("Dropping unrecognized search parameter '{}'", other);
                }
            }
        }
    }

    SearchRequest { spec, skip, limit }
}

fn lowercase_list(value: &str) -> Vec<String> {
    split_list(value).map(str::to_lowercase).collect()
}

/// Parses a requested page size; unusable or zero values fall back to the maximum
fn clamp_limit(value: &str) -> u32 {
    match value.parse::<u32>() {
        Ok(0) | Err(_) => MAX_LIMIT,
        Ok(n) => n.min(MAX_LIMIT),
    }
}
