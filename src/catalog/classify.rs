//! Title type and release year classification
//!
//! The detail page shows a short metadata row under the title. For films the
//! row starts with the release year (a link); for other titles it starts with
//! a plain type label such as "TV Series" followed by the year. The HTML
//! source flattens that row into a [`MetadataRow`] and this module decides
//! what it means.

use crate::catalog::record::TitleType;
use std::collections::BTreeSet;

/// One entry of the metadata row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataEntry {
    /// Plain text with no nested elements (a type label)
    Label(String),
    /// Text carried by a nested element, usually a link
    Linked(String),
}

impl MetadataEntry {
    pub fn text(&self) -> &str {
        match self {
            Self::Label(text) | Self::Linked(text) => text,
        }
    }
}

/// The flattened metadata row of a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    pub entries: Vec<MetadataEntry>,
}

impl MetadataRow {
    pub fn new(entries: Vec<MetadataEntry>) -> Self {
        Self { entries }
    }
}

/// Result of classifying a metadata row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Type and release year were determined
    Classified { kind: TitleType, year: String },
    /// The row is too short to carry rating metadata
    Unrated,
}

/// Classifies a title from its metadata row and genres
///
/// Rows with fewer than two entries belong to unrated titles. When the first
/// entry is a non-empty plain label it names the type and the year follows in
/// the second entry; otherwise the first entry is the year and the type is
/// inferred from the genres.
pub fn classify(row: &MetadataRow, genres: &BTreeSet<String>) -> Classification {
    let (first, second) = match row.entries.as_slice() {
        [first, second, ..] => (first, second),
        _ => return Classification::Unrated,
    };

    match first {
        MetadataEntry::Label(label) if !label.trim().is_empty() => Classification::Classified {
            kind: kind_from_label(label),
            year: year_prefix(second.text()),
        },
        _ => Classification::Classified {
            kind: kind_from_genres(genres),
            year: year_prefix(first.text()),
        },
    }
}

fn kind_from_label(label: &str) -> TitleType {
    let label = label.to_lowercase();
    if label.contains("series") {
        TitleType::Series
    } else if label.contains("short") {
        TitleType::Short
    } else if label.contains("game") {
        TitleType::Game
    } else {
        TitleType::Film
    }
}

fn kind_from_genres(genres: &BTreeSet<String>) -> TitleType {
    if genres.contains("documentary") {
        TitleType::Documentary
    } else if genres.contains("short") {
        TitleType::Short
    } else {
        TitleType::Film
    }
}

/// First four characters, e.g. "2019–2023" becomes "2019"
fn year_prefix(text: &str) -> String {
    text.trim().chars().take(4).collect()
}
