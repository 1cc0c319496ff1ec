//! Catalog record definitions
//!
//! This module defines the records stored in the catalog and the partial
//! record produced by the detail-page parser before advisory enrichment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifiers reserved for control documents; never returned by a search
pub const RESERVED_IDS: [&str; 2] = ["cursor", "genres"];

/// Returns true if the identifier is reserved for a control document
pub fn is_reserved_id(id: &str) -> bool {
    RESERVED_IDS.contains(&id)
}

/// Classification of a catalog title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleType {
    Film,
    Series,
    Short,
    Game,
    Documentary,
}

impl TitleType {
    /// Converts the title type to its stored string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Film => "film",
            Self::Series => "series",
            Self::Short => "short",
            Self::Game => "game",
            Self::Documentary => "documentary",
        }
    }

    /// Parses a title type from its stored string representation
    ///
    /// Returns None if the string doesn't match any known type.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "film" => Some(Self::Film),
            "series" => Some(Self::Series),
            "short" => Some(Self::Short),
            "game" => Some(Self::Game),
            "documentary" => Some(Self::Documentary),
            _ => None,
        }
    }

    /// Returns all title types
    pub fn all() -> [Self; 5] {
        [
            Self::Film,
            Self::Series,
            Self::Short,
            Self::Game,
            Self::Documentary,
        ]
    }
}

impl fmt::Display for TitleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Content-advisory categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryCategory {
    Nudity,
    Violence,
    Profanity,
    Substance,
    Fear,
}

impl AdvisoryCategory {
    pub const ALL: [Self; 5] = [
        Self::Nudity,
        Self::Violence,
        Self::Profanity,
        Self::Substance,
        Self::Fear,
    ];

    /// Field name used in queries and storage columns
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nudity => "nudity",
            Self::Violence => "violence",
            Self::Profanity => "profanity",
            Self::Substance => "substance",
            Self::Fear => "fear",
        }
    }

    /// Parses a category from its field name
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

/// Severity code used when an advisory section is missing or unrecognized
pub const SEVERITY_UNKNOWN: u8 = 4;

/// Advisory severities, each 0 (none) through 3 (severe), 4 = unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub nudity: u8,
    pub violence: u8,
    pub profanity: u8,
    pub substance: u8,
    pub fear: u8,
}

impl Advisory {
    /// All categories unknown
    pub fn unknown() -> Self {
        Self {
            nudity: SEVERITY_UNKNOWN,
            violence: SEVERITY_UNKNOWN,
            profanity: SEVERITY_UNKNOWN,
            substance: SEVERITY_UNKNOWN,
            fear: SEVERITY_UNKNOWN,
        }
    }

    pub fn get(&self, category: AdvisoryCategory) -> u8 {
        match category {
            AdvisoryCategory::Nudity => self.nudity,
            AdvisoryCategory::Violence => self.violence,
            AdvisoryCategory::Profanity => self.profanity,
            AdvisoryCategory::Substance => self.substance,
            AdvisoryCategory::Fear => self.fear,
        }
    }

    pub fn set(&mut self, category: AdvisoryCategory, severity: u8) {
        let slot = match category {
            AdvisoryCategory::Nudity => &mut self.nudity,
            AdvisoryCategory::Violence => &mut self.violence,
            AdvisoryCategory::Profanity => &mut self.profanity,
            AdvisoryCategory::Substance => &mut self.substance,
            AdvisoryCategory::Fear => &mut self.fear,
        };
        *slot = severity.min(SEVERITY_UNKNOWN);
    }
}

impl Default for Advisory {
    fn default() -> Self {
        Self::unknown()
    }
}

/// A title as extracted from its detail page, before advisory enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub id: String,
    pub title: String,
    pub kind: TitleType,
    pub release_year: String,
    pub genres: BTreeSet<String>,
    pub rating: u8,
    pub popularity: u64,
    pub poster_url: String,
    pub synopsis: Option<String>,
}

impl RecordDraft {
    /// Completes the draft with advisory severities
    pub fn with_advisory(self, advisory: Advisory) -> CatalogRecord {
        CatalogRecord {
            id: self.id,
            title: self.title,
            kind: self.kind,
            release_year: self.release_year,
            genres: self.genres,
            rating: self.rating,
            popularity: self.popularity,
            poster_url: self.poster_url,
            synopsis: self.synopsis,
            advisory,
        }
    }
}

/// A complete catalog record
///
/// The identifier is the stable external key; storing a record with an
/// existing identifier replaces the previous record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TitleType,
    pub release_year: String,
    pub genres: BTreeSet<String>,
    pub rating: u8,
    pub popularity: u64,
    pub poster_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    pub advisory: Advisory,
}
