//! Crawl cursor and its state machine
//!
//! The cursor records which partition and rank position the crawler will
//! process next, plus a backoff counter of long cooldown cycles still owed to
//! the external index. Persisting the counter means a restart does not reset
//! the cooldown.
//!
//! Each cycle the controller asks [`plan`] what to do, runs it, and folds the
//! outcome into exactly one [`Transition`] that is applied to the cursor.

use crate::config::CrawlerConfig;
use crate::state::Partition;
use std::fmt;

/// Persisted crawl position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlCursor {
    /// Partition currently being crawled
    pub partition: Partition,

    /// 1-based rank position of the next title to fetch
    pub position: u32,

    /// Remaining long-interval cycles to sit out before crawling resumes
    pub backoff: u32,
}

impl CrawlCursor {
    /// Creates a cursor; positions below 1 are raised to 1
    pub fn new(partition: Partition, position: u32, backoff: u32) -> Self {
        Self {
            partition,
            position: position.max(1),
            backoff,
        }
    }

    /// Cursor used when a crawl is started from scratch
    pub fn initial() -> Self {
        Self::new(Partition::Film, 1, 0)
    }

    /// Applies a transition and returns the resulting cursor
    pub fn apply(&self, transition: Transition, policy: &CursorPolicy) -> Self {
        match transition {
            Transition::Advance => Self {
                position: self.position.saturating_add(1),
                ..*self
            },
            Transition::SwitchPartition => {
                let partition = self.partition.toggled();
                Self::new(partition, 1, policy.seed_backoff(partition))
            }
            Transition::HoldRetry => *self,
            Transition::HoldBackoff => Self {
                backoff: self.backoff.saturating_sub(1),
                ..*self
            },
        }
    }
}

impl fmt::Display for CrawlCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.partition, self.position)?;
        if self.backoff > 0 {
            write!(f, " (backoff {})", self.backoff)?;
        }
        Ok(())
    }
}

/// Limits that drive the cursor state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPolicy {
    /// Positions above this are treated as an exhausted partition
    pub position_ceiling: u32,

    /// Backoff seeded when switching into the film partition
    pub film_seed_backoff: u32,

    /// Backoff seeded when switching into the game partition
    pub game_seed_backoff: u32,
}

impl CursorPolicy {
    /// Backoff assigned when entering the given partition
    pub fn seed_backoff(&self, partition: Partition) -> u32 {
        match partition {
            Partition::Film => self.film_seed_backoff,
            Partition::Game => self.game_seed_backoff,
        }
    }
}

impl Default for CursorPolicy {
    fn default() -> Self {
        Self {
            position_ceiling: 4444,
            film_seed_backoff: 30,
            game_seed_backoff: 0,
        }
    }
}

impl From<&CrawlerConfig> for CursorPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            position_ceiling: config.position_ceiling,
            film_seed_backoff: config.film_seed_backoff,
            game_seed_backoff: config.game_seed_backoff,
        }
    }
}

/// What a cycle should do before any fetch happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// The position ran past the ceiling; move to the other partition
    SwitchPartition,

    /// No cursor has been stored yet; wait and try again
    ColdStart,

    /// Sit out one long interval and decrement the backoff counter
    Backoff,

    /// Fetch, parse and merge the title at the cursor position
    Crawl,
}

/// The single cursor mutation a cycle performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The title was merged; move to the next position
    Advance,

    /// Toggle partition, reset position, seed backoff
    SwitchPartition,

    /// Keep the cursor unchanged and retry the same position
    HoldRetry,

    /// Keep the position and decrement the backoff counter
    HoldBackoff,
}

/// Decides the plan for a cycle
///
/// Checks are evaluated in precedence order: exhaustion, cold start,
/// backoff, crawl.
pub fn plan(cursor: Option<&CrawlCursor>, policy: &CursorPolicy) -> Plan {
    match cursor {
        Some(c) if c.position > policy.position_ceiling => Plan::SwitchPartition,
        None => Plan::ColdStart,
        Some(c) if c.backoff > 0 => Plan::Backoff,
        Some(_) => Plan::Crawl,
    }
}
