//! Provider traits and structured error types.
//!
//! Two upstream sources feed the alignment engine: an event provider
//! (earnings announcements) and a price provider (daily adjusted closes).
//! Both are traits so the batch can swap implementations and mock them in
//! tests. The record store sits above these traits; providers don't know
//! about it.

use crate::align::UnknownTiming;
use crate::domain::{AnnouncementEvent, TradingSession};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in both log lines and the batch
/// summary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parse error in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("no cached records for '{symbol}' on {run_date}")]
    NoCachedData { symbol: String, run_date: NaiveDate },

    #[error("data error: {0}")]
    Other(String),
}

/// Where a price series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Source of earnings announcements.
///
/// Implementations normalize their timing convention into
/// [`TimingTag`](crate::domain::TimingTag) and return events in ascending
/// date order. Each source states how its untagged events are attributed.
pub trait EventProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch all announcements for a symbol. May be empty.
    fn fetch_events(&self, symbol: &str) -> Result<Vec<AnnouncementEvent>, DataError>;

    /// How this source's untagged announcements should be attributed.
    fn unknown_timing(&self) -> UnknownTiming;
}

/// Source of daily adjusted closes.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which [`DataSource`] this provider represents.
    fn source(&self) -> DataSource;

    /// Fetch trading sessions for a symbol over an inclusive date range.
    ///
    /// A window in which the symbol did not trade yields an empty series.
    fn fetch_sessions(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}
