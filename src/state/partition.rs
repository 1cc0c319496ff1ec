//! Catalog partitions crawled by the controller
//!
//! The ranked index is crawled as two independent pools that the controller
//! alternates between.

use std::fmt;

/// One of the two ranked title pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Feature films and other film-like titles
    Film,

    /// Video games
    Game,
}

impl Partition {
    /// Returns the other partition
    pub fn toggled(&self) -> Self {
        match self {
            Self::Film => Self::Game,
            Self::Game => Self::Film,
        }
    }

    /// Converts the partition to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Film => "film",
            Self::Game => "game",
        }
    }

    /// Parses a partition from a database string representation
    ///
    /// Returns None if the string doesn't match any known partition.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "film" => Some(Self::Film),
            "game" => Some(Self::Game),
            _ => None,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
