//! Announcement events and their timing tags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// When an announcement was made relative to the trading day.
///
/// Providers report timing in different conventions (a categorical
/// BMO/AMC tag, or the hour of the release). Both are normalized into this
/// enum at the provider boundary so the resolver never branches on source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingTag {
    /// Released before the market opened.
    BeforeMarketOpen,
    /// Released after the market closed.
    AfterMarketClose,
    /// Released at the given local hour (0–23).
    Hour(u8),
    /// The provider did not say.
    Unknown,
}

/// Tokens that providers use for "time not supplied".
const UNKNOWN_TOKENS: &[&str] = &["", "--", "TNS", "N/A", "NA"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized timing tag '{0}'")]
pub struct ParseTimingError(pub String);

impl FromStr for TimingTag {
    type Err = ParseTimingError;

    /// Accepts `BMO`, `AMC`, an integer hour, `HH:MM`, or an unknown marker.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let upper = token.to_ascii_uppercase();

        if UNKNOWN_TOKENS.contains(&upper.as_str()) {
            return Ok(TimingTag::Unknown);
        }
        match upper.as_str() {
            "BMO" => return Ok(TimingTag::BeforeMarketOpen),
            "AMC" => return Ok(TimingTag::AfterMarketClose),
            _ => {}
        }

        let hour_part = token.split(':').next().unwrap_or(token);
        match hour_part.parse::<u8>() {
            Ok(hour) if hour <= 23 => Ok(TimingTag::Hour(hour)),
            _ => Err(ParseTimingError(token.to_string())),
        }
    }
}

impl fmt::Display for TimingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingTag::BeforeMarketOpen => write!(f, "BMO"),
            TimingTag::AfterMarketClose => write!(f, "AMC"),
            TimingTag::Hour(h) => write!(f, "{h}"),
            TimingTag::Unknown => Ok(()),
        }
    }
}

/// One reported earnings announcement for one equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementEvent {
    pub entity_id: String,
    pub calendar_date: NaiveDate,
    pub timing: TimingTag,
    /// Consensus estimate (EPS), when the provider reports one.
    pub estimated_metric: Option<f64>,
    /// Reported actual (EPS), when already announced.
    pub actual_metric: Option<f64>,
}

impl AnnouncementEvent {
    pub fn new(entity_id: impl Into<String>, calendar_date: NaiveDate, timing: TimingTag) -> Self {
        Self {
            entity_id: entity_id.into(),
            calendar_date,
            timing,
            estimated_metric: None,
            actual_metric: None,
        }
    }

    pub fn with_metrics(mut self, estimated: Option<f64>, actual: Option<f64>) -> Self {
        self.estimated_metric = estimated;
        self.actual_metric = actual;
        self
    }
}
