//! Announcement-to-session resolution.
//!
//! Given an announcement and the entity's calendar index, pick the closes
//! that bracket it. The lookup is a single upper-bound search for the
//! announcement date; the session side then fixes a window of four
//! positions around that point:
//!
//! ```text
//!              idx-3   idx-2   idx-1    idx    idx+1
//! AfterClose           pprev   prev     next   nnext
//! BeforeOpen   pprev   prev    next     nnext
//! ```
//!
//! Positions outside the series resolve to unavailable individually. When
//! the announcement predates every known session (`idx == 0`) the whole
//! window is unavailable.

use crate::calendar::TradingCalendarIndex;
use crate::domain::{AnnouncementEvent, PriceWindow, SessionSide, TimingTag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Announcements at or after this hour, and before the close hour, are intraday.
pub const MARKET_OPEN_HOUR: u8 = 9;

/// Last intraday hour; later announcements are after the close.
pub const MARKET_CLOSE_HOUR: u8 = 16;

/// How an untagged announcement is attributed. Configured per event source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTiming {
    /// Treat as after market close.
    #[default]
    AfterClose,
    /// Treat as before market open.
    BeforeOpen,
    /// Refuse to guess; the entity fails.
    Reject,
}

/// Provider contract violations. Each one is fatal for the whole entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("announcement on {date} at hour {hour} falls inside market hours")]
    TimingAmbiguous { date: NaiveDate, hour: u8 },

    #[error("announcement on {date} has hour {hour}, outside 0..=23")]
    HourOutOfRange { date: NaiveDate, hour: u8 },

    #[error("announcement on {date} has no timing tag and the source rejects untagged events")]
    TimingMissing { date: NaiveDate },

    #[error("announcement on {next} does not follow {prev}")]
    EventOrder { prev: NaiveDate, next: NaiveDate },
}

/// Why some closes of a resolved window are unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataGap {
    /// The announcement predates every known session.
    SeriesExhausted,
    /// Some positions fell outside the series or hit void sessions.
    FieldsUnavailable(usize),
}

/// Output of resolving one announcement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub session: SessionSide,
    pub prices: PriceWindow,
    pub gap: Option<DataGap>,
}

/// Maps announcements onto a calendar index.
///
/// Stateless apart from the unknown-timing policy, so one resolver can be
/// shared by every entity of an event source.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentResolver {
    unknown_timing: UnknownTiming,
}

impl AlignmentResolver {
    pub fn new(unknown_timing: UnknownTiming) -> Self {
        Self { unknown_timing }
    }

    pub fn unknown_timing(&self) -> UnknownTiming {
        self.unknown_timing
    }

    /// Decide which side of the session an announcement falls on.
    pub fn classify(&self, event: &AnnouncementEvent) -> Result<SessionSide, AlignError> {
        match event.timing {
            TimingTag::BeforeMarketOpen => Ok(SessionSide::BeforeOpen),
            TimingTag::AfterMarketClose => Ok(SessionSide::AfterClose),
            TimingTag::Hour(hour) if hour > 23 => Err(AlignError::HourOutOfRange {
                date: event.calendar_date,
                hour,
            }),
            TimingTag::Hour(hour) if hour > MARKET_CLOSE_HOUR => Ok(SessionSide::AfterClose),
            TimingTag::Hour(hour) if hour < MARKET_OPEN_HOUR => Ok(SessionSide::BeforeOpen),
            TimingTag::Hour(hour) => Err(AlignError::TimingAmbiguous {
                date: event.calendar_date,
                hour,
            }),
            TimingTag::Unknown => match self.unknown_timing {
                UnknownTiming::AfterClose => Ok(SessionSide::AfterClose),
                UnknownTiming::BeforeOpen => Ok(SessionSide::BeforeOpen),
                UnknownTiming::Reject => Err(AlignError::TimingMissing {
                    date: event.calendar_date,
                }),
            },
        }
    }

    /// Resolve the closes bracketing an announcement.
    pub fn resolve(
        &self,
        event: &AnnouncementEvent,
        index: &TradingCalendarIndex,
    ) -> Result<Resolution, AlignError> {
        let session = self.classify(event)?;
        let idx = index.upper_bound(event.calendar_date);

        if idx == 0 {
            return Ok(Resolution {
                session,
                prices: PriceWindow::unavailable(),
                gap: Some(DataGap::SeriesExhausted),
            });
        }

        // `anchor` is the position of the first session after the announcement.
        // An announcement past the last session keeps the last known closes as
        // its lookback, however old they are; only the forward fields go empty.
        let anchor = match session {
            SessionSide::AfterClose => idx as isize,
            SessionSide::BeforeOpen => idx as isize - 1,
        };

        let prices = PriceWindow {
            prev_prev_close: index.close_at(anchor - 2),
            prev_close: index.close_at(anchor - 1),
            next_close: index.close_at(anchor),
            next_next_close: index.close_at(anchor + 1),
        };

        let missing = prices.unavailable_count();
        let gap = (missing > 0).then_some(DataGap::FieldsUnavailable(missing));

        Ok(Resolution {
            session,
            prices,
            gap,
        })
    }
}
