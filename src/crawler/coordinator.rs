//! Crawler coordinator - the paced crawl controller loop
//!
//! This module contains the long-running loop that drives the catalog crawl:
//! - Waiting the pacing interval between cycles
//! - Reading the cursor and planning the cycle
//! - Running the fetch, parse and merge pipeline
//! - Folding the outcome into a single cursor write
//! - Stopping promptly when shutdown is signalled
//!
//! Cycles are strictly sequential. A failed cycle is logged and the cursor is
//! held, so the same position is retried on the next paced cycle; no failure
//! ends the loop.

use crate::config::CrawlerConfig;
use crate::crawler::parser::{ExtractionFailure, PageSource};
use crate::state::{plan, CrawlCursor, CursorPolicy, Plan, Transition};
use crate::storage::{lock_store, CatalogStore, StorageError, StorageResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that end a single cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("extraction failed at {cursor}: {source}")]
    Extraction {
        cursor: CrawlCursor,
        #[source]
        source: ExtractionFailure,
    },

    #[error("cursor could not be read: {0}")]
    CursorRead(#[source] StorageError),

    #[error("record {id} could not be stored: {source}")]
    RecordWrite {
        id: String,
        #[source]
        source: StorageError,
    },

    #[error("cursor could not be written: {0}")]
    CursorWrite(#[source] StorageError),
}

/// Waits applied by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlTimings {
    /// Wait before every cycle
    pub pacing: Duration,

    /// Wait for each backoff cycle
    pub backoff: Duration,

    /// Extra wait while no readable cursor exists
    pub cold_start: Duration,
}

impl From<&CrawlerConfig> for CrawlTimings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            pacing: config.pacing(),
            backoff: config.backoff(),
            cold_start: config.cold_start(),
        }
    }
}

/// What a finished cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No cursor was stored; nothing was written
    ColdStart,

    /// The cursor was moved and written back
    Completed {
        transition: Transition,
        cursor: CrawlCursor,
        stored: Option<String>,
    },
}

/// Totals reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub cycles: u64,
    pub records_stored: u64,
    pub held_cycles: u64,
}

/// Main crawler coordinator structure
pub struct Coordinator<P, S>
where
    P: PageSource,
    S: CatalogStore + Send,
{
    source: P,
    store: Arc<Mutex<S>>,
    policy: CursorPolicy,
    timings: CrawlTimings,
}

impl<P, S> Coordinator<P, S>
where
    P: PageSource,
    S: CatalogStore + Send,
{
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `source` - Where candidates and title details come from
    /// * `store` - The shared catalog store; the coordinator is its only cursor writer
    /// * `policy` - Ceiling and seed backoffs for the cursor state machine
    /// * `timings` - Pacing, backoff and cold start waits
    pub fn new(
        source: P,
        store: Arc<Mutex<S>>,
        policy: CursorPolicy,
        timings: CrawlTimings,
    ) -> Self {
        Self {
            source,
            store,
            policy,
            timings,
        }
    }

    /// Runs a closure against the store without holding the lock across an await
    fn with_store<T>(&self, f: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut store = lock_store(&*self.store)?;
        f(&mut *store)
    }

    /// Runs the crawl loop until `shutdown` turns true or its sender is dropped
    ///
    /// Shutdown interrupts pacing and backoff waits and abandons any
    /// in-flight cycle. An abandoned cycle writes no cursor.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> CrawlSummary {
        let mut summary = CrawlSummary::default();

        match self.with_store(|store| store.reconcile_genre_index()) {
            Ok(0) => {}
            Ok(added) => tracing::info!("Reconciled genre index: {} genres added", added),
            Err(e) => tracing::warn!("Genre index reconciliation failed: {}", e),
        }

        tracing::info!("Crawl loop started (pacing {:?})", self.timings.pacing);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.timings.pacing) => {}
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("Shutdown requested; abandoning in-flight cycle");
                    break;
                }
                result = self.run_cycle() => {
                    summary.cycles += 1;
                    match result {
                        Ok(CycleOutcome::Completed { transition, cursor, stored }) => {
                            if stored.is_some() {
                                summary.records_stored += 1;
                            }
                            if transition == Transition::HoldRetry {
                                summary.held_cycles += 1;
                            }
                            tracing::debug!("Cycle finished with {:?}, cursor now {}", transition, cursor);
                        }
                        Ok(CycleOutcome::ColdStart) => {}
                        Err(e) => {
                            summary.held_cycles += 1;
                            tracing::warn!("Cycle failed: {}", e);
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Crawl loop stopped: {} cycles, {} records stored, {} held",
            summary.cycles,
            summary.records_stored,
            summary.held_cycles
        );

        summary
    }

    /// Runs one cycle: read, plan, act, write
    ///
    /// The cursor write is the final step and happens at most once. Cold
    /// starts write nothing. A failed cursor read also writes nothing and
    /// waits out the cold-start delay before reporting the error.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let current = match self.with_store(|store| store.read_cursor()) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(
                    "Crawl cursor unreadable; retrying after {:?}",
                    self.timings.cold_start
                );
                tokio::time::sleep(self.timings.cold_start).await;
                return Err(CycleError::CursorRead(e));
            }
        };

        let (cursor, transition, stored) = match (plan(current.as_ref(), &self.policy), current) {
            (Plan::ColdStart, _) | (_, None) => {
                tracing::info!(
                    "No crawl cursor stored; retrying after {:?}",
                    self.timings.cold_start
                );
                tokio::time::sleep(self.timings.cold_start).await;
                return Ok(CycleOutcome::ColdStart);
            }
            (Plan::SwitchPartition, Some(cursor)) => {
                tracing::info!("Partition {} exhausted at {}", cursor.partition, cursor);
                (cursor, Transition::SwitchPartition, None)
            }
            (Plan::Backoff, Some(cursor)) => {
                tracing::info!(
                    "Backing off for {:?} at {}",
                    self.timings.backoff,
                    cursor
                );
                tokio::time::sleep(self.timings.backoff).await;
                (cursor, Transition::HoldBackoff, None)
            }
            (Plan::Crawl, Some(cursor)) => match self.crawl_position(&cursor).await {
                Ok(Some(id)) => (cursor, Transition::Advance, Some(id)),
                Ok(None) => {
                    tracing::info!("Ranking for {} ended at {}", cursor.partition, cursor);
                    (cursor, Transition::SwitchPartition, None)
                }
                Err(e) => {
                    tracing::warn!("Holding cursor: {}", e);
                    (cursor, Transition::HoldRetry, None)
                }
            },
        };

        let next = cursor.apply(transition, &self.policy);
        self.with_store(|store| store.write_cursor(&next))
            .map_err(CycleError::CursorWrite)?;

        Ok(CycleOutcome::Completed {
            transition,
            cursor: next,
            stored,
        })
    }

    /// Fetches, parses and stores the title at the cursor position
    ///
    /// Returns `Ok(None)` when the partition's ranking is exhausted.
    async fn crawl_position(&self, cursor: &CrawlCursor) -> Result<Option<String>, CycleError> {
        let extraction = |source| CycleError::Extraction {
            cursor: *cursor,
            source,
        };

        let Some(id) = self
            .source
            .find_next_candidate(cursor.partition, cursor.position)
            .await
            .map_err(extraction)?
        else {
            return Ok(None);
        };

        let draft = self.source.parse_record(&id).await.map_err(extraction)?;
        let record = self
            .source
            .parse_advisory(&id, draft)
            .await
            .map_err(extraction)?;

        let outcome = self
            .with_store(|store| store.upsert_record(&record))
            .map_err(|source| CycleError::RecordWrite {
                id: id.clone(),
                source,
            })?;

        if !outcome.genre_index_synced {
            tracing::warn!("Genre index is behind after storing {}", id);
        }
        tracing::info!("Stored {} \"{}\" from {}", id, record.title, cursor);

        Ok(Some(id))
    }
}
