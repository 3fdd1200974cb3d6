//! Trading calendar index: sorted session dates with upper-bound lookup.
//!
//! Built once per entity from the fetched close series. Every alignment
//! lookup is phrased in terms of [`TradingCalendarIndex::upper_bound`]: the
//! position of the first session strictly after a date. Offsets around that
//! position may fall outside the series; [`TradingCalendarIndex::close_at`]
//! answers `None` for those instead of panicking.

use crate::domain::TradingSession;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("duplicate trading session on {0}")]
    DuplicateSession(NaiveDate),
}

/// Sorted, de-duplicated trading sessions of one entity.
#[derive(Debug, Clone, Default)]
pub struct TradingCalendarIndex {
    dates: Vec<NaiveDate>,
    sessions: Vec<TradingSession>,
}

impl TradingCalendarIndex {
    /// Build the index from a session series.
    ///
    /// Sessions are sorted by date. Two sessions on the same date are a
    /// data-source error and rejected.
    pub fn build(mut sessions: Vec<TradingSession>) -> Result<Self, CalendarError> {
        sessions.sort_by_key(|s| s.calendar_date);

        if let Some(pair) = sessions
            .windows(2)
            .find(|w| w[0].calendar_date == w[1].calendar_date)
        {
            return Err(CalendarError::DuplicateSession(pair[0].calendar_date));
        }

        let dates = sessions.iter().map(|s| s.calendar_date).collect();
        Ok(Self { dates, sessions })
    }

    /// An index with no sessions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Position of the first session whose date is strictly greater than `date`.
    ///
    /// Every session before the returned position is on or before `date`;
    /// every session from it onward is after `date`.
    pub fn upper_bound(&self, date: NaiveDate) -> usize {
        self.dates.partition_point(|d| *d <= date)
    }

    /// Close at a signed position, or `None` if out of range or void.
    pub fn close_at(&self, pos: isize) -> Option<f64> {
        let pos = usize::try_from(pos).ok()?;
        self.sessions.get(pos).and_then(TradingSession::close)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn sessions(&self) -> &[TradingSession] {
        &self.sessions
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}
