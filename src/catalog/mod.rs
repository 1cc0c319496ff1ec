//! Catalog data model
//!
//! This module contains the catalog record types and the pure functions that
//! turn raw page text into catalog values:
//! - Severity, rating and popularity normalizers
//! - Title type and release year classification

mod classify;
mod normalize;
mod record;

pub use classify::{classify, Classification, MetadataEntry, MetadataRow};
pub use normalize::{normalize_popularity, normalize_rating, normalize_severity};
pub use record::{
    is_reserved_id, Advisory, AdvisoryCategory, CatalogRecord, RecordDraft, TitleType,
    RESERVED_IDS, SEVERITY_UNKNOWN,
};
