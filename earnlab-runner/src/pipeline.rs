//! Per-entity pipeline: cache check → fetch → align → build → persist.
//!
//! One entity runs entirely inside one worker, sequentially. The outcome is
//! a typed value; nothing here aborts other entities.
//!
//! State machine per entity:
//!
//! ```text
//! Pending ──► Cached                      (record file already present)
//!    │
//!    └──────► Fetching ──► Aligned        (records written)
//!                     └──► Failed         (fetch, contract or store error)
//! ```

use chrono::{Duration, NaiveDate};
use earnlab_core::align::{build_records, AlignError, AlignmentResolver};
use earnlab_core::calendar::{CalendarError, TradingCalendarIndex};
use earnlab_core::data::{DataError, EventProvider, PriceProvider, RecordStore};
use earnlab_core::domain::AnnouncementEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Lifecycle state of one entity within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Pending,
    Cached,
    Fetching,
    Aligned,
    Failed,
}

impl EntityState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cached | Self::Aligned | Self::Failed)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Cached => "cached",
            Self::Fetching => "fetching",
            Self::Aligned => "aligned",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Coarse class of an entity failure, for the batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, provider or parse failure while fetching.
    Fetch,
    /// The provider broke its contract (ambiguous timing, duplicate
    /// sessions, events out of order).
    ContractViolation,
    /// The record file could not be written.
    Store,
}

/// Why an entity failed. Fatal for that entity only.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("event fetch failed: {0}")]
    EventFetch(#[source] DataError),

    #[error("price fetch failed: {0}")]
    PriceFetch(#[source] DataError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Alignment(#[from] AlignError),

    #[error("record write failed: {0}")]
    Store(#[source] DataError),
}

impl EntityError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EventFetch(_) | Self::PriceFetch(_) => FailureKind::Fetch,
            Self::Calendar(_) | Self::Alignment(_) => FailureKind::ContractViolation,
            Self::Store(_) => FailureKind::Store,
        }
    }
}

/// Counts reported for an aligned entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentStats {
    pub records: usize,
    /// Records whose announcement predates the price series.
    pub exhausted: usize,
    /// Records with some closes unavailable.
    pub partial: usize,
}

/// Terminal result of one entity's pipeline.
#[derive(Debug)]
pub enum EntityOutcome {
    Cached,
    Aligned(AlignmentStats),
    Failed(EntityError),
}

impl EntityOutcome {
    pub fn state(&self) -> EntityState {
        match self {
            Self::Cached => EntityState::Cached,
            Self::Aligned(_) => EntityState::Aligned,
            Self::Failed(_) => EntityState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    pub fn error(&self) -> Option<&EntityError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Everything a worker needs, shared read-only across the pool.
pub struct PipelineContext<'a> {
    pub run_date: NaiveDate,
    pub events: &'a dyn EventProvider,
    pub prices: &'a dyn PriceProvider,
    pub store: &'a dyn RecordStore,
    pub window_padding_days: i64,
}

/// Inclusive price window covering every event plus padding, capped at the
/// run date. `None` when there is nothing to fetch.
pub fn price_window(
    events: &[AnnouncementEvent],
    padding_days: i64,
    run_date: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    let earliest = events.iter().map(|e| e.calendar_date).min()?;
    let latest = events.iter().map(|e| e.calendar_date).max()?;

    let padding = Duration::days(padding_days);
    let start = earliest.checked_sub_signed(padding)?;
    let end = latest
        .checked_add_signed(padding)
        .map_or(run_date, |d| d.min(run_date));

    (start <= end).then_some((start, end))
}

fn transition(symbol: &str, from: EntityState, to: EntityState) {
    debug!(entity = symbol, %from, %to, "entity state");
}

/// Run the pipeline for one entity.
pub fn process_entity(ctx: &PipelineContext<'_>, symbol: &str) -> EntityOutcome {
    if ctx.store.exists(ctx.run_date, symbol) {
        transition(symbol, EntityState::Pending, EntityState::Cached);
        return EntityOutcome::Cached;
    }

    transition(symbol, EntityState::Pending, EntityState::Fetching);
    let outcome = match fetch_align_persist(ctx, symbol) {
        Ok(stats) => EntityOutcome::Aligned(stats),
        Err(e) => EntityOutcome::Failed(e),
    };
    transition(symbol, EntityState::Fetching, outcome.state());
    outcome
}

fn fetch_align_persist(
    ctx: &PipelineContext<'_>,
    symbol: &str,
) -> Result<AlignmentStats, EntityError> {
    let events = ctx
        .events
        .fetch_events(symbol)
        .map_err(EntityError::EventFetch)?;

    let sessions = match price_window(&events, ctx.window_padding_days, ctx.run_date) {
        Some((start, end)) => {
            if !ctx.prices.is_available() {
                return Err(EntityError::PriceFetch(DataError::CircuitBreakerTripped));
            }
            ctx.prices
                .fetch_sessions(symbol, start, end)
                .map_err(EntityError::PriceFetch)?
        }
        None => Vec::new(),
    };

    let index = TradingCalendarIndex::build(sessions)?;
    let resolver = AlignmentResolver::new(ctx.events.unknown_timing());
    let set = build_records(&events, &index, &resolver)?;

    ctx.store
        .write(ctx.run_date, symbol, &set.records)
        .map_err(EntityError::Store)?;

    Ok(AlignmentStats {
        records: set.len(),
        exhausted: set.exhausted,
        partial: set.partial,
    })
}
