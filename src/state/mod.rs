//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Partition`: The two ranked pools the crawler alternates between
//! - `CrawlCursor`: The persisted crawl position and backoff counter
//! - `plan` / `Transition`: The cursor state machine driven by the controller

mod cursor;
mod partition;

// Re-export main types
pub use cursor::{plan, CrawlCursor, CursorPolicy, Plan, Transition};
pub use partition::Partition;
