//! AlignedRecord: an announcement joined with its bracketing closes.

use super::event::{AnnouncementEvent, TimingTag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a trading session an announcement falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionSide {
    /// Before market open: the announcement precedes the session on its date.
    BeforeOpen,
    /// After market close: the announcement follows the session on its date.
    AfterClose,
}

impl fmt::Display for SessionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionSide::BeforeOpen => write!(f, "BMO"),
            SessionSide::AfterClose => write!(f, "AMC"),
        }
    }
}

impl FromStr for SessionSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BMO" => Ok(SessionSide::BeforeOpen),
            "AMC" => Ok(SessionSide::AfterClose),
            other => Err(format!("unknown session side '{other}'")),
        }
    }
}

/// The four closes around an announcement. `None` means unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceWindow {
    pub prev_prev_close: Option<f64>,
    pub prev_close: Option<f64>,
    pub next_close: Option<f64>,
    pub next_next_close: Option<f64>,
}

impl PriceWindow {
    /// All four closes unavailable.
    pub fn unavailable() -> Self {
        Self::default()
    }

    fn fields(&self) -> [Option<f64>; 4] {
        [
            self.prev_prev_close,
            self.prev_close,
            self.next_close,
            self.next_next_close,
        ]
    }

    /// Number of closes that could not be resolved.
    pub fn unavailable_count(&self) -> usize {
        self.fields().iter().filter(|f| f.is_none()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable_count() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.unavailable_count() == 4
    }
}

/// One announcement aligned to the trading calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRecord {
    pub entity_id: String,
    pub calendar_date: NaiveDate,
    pub timing: TimingTag,
    pub session: SessionSide,
    pub estimated_metric: Option<f64>,
    pub actual_metric: Option<f64>,
    pub prices: PriceWindow,
}

impl AlignedRecord {
    pub fn new(event: &AnnouncementEvent, session: SessionSide, prices: PriceWindow) -> Self {
        Self {
            entity_id: event.entity_id.clone(),
            calendar_date: event.calendar_date,
            timing: event.timing,
            session,
            estimated_metric: event.estimated_metric,
            actual_metric: event.actual_metric,
            prices,
        }
    }

    /// Surprise relative to estimate, when both metrics are present.
    pub fn surprise(&self) -> Option<f64> {
        Some(self.actual_metric? - self.estimated_metric?)
    }

    /// Close-to-close move across the announcement, when both closes exist.
    pub fn event_return(&self) -> Option<f64> {
        let prev = self.prices.prev_close?;
        let next = self.prices.next_close?;
        if prev == 0.0 {
            return None;
        }
        Some(next / prev - 1.0)
    }
}
