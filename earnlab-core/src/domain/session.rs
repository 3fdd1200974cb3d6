//! TradingSession: one day the market was open for an entity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing price of one trading session.
///
/// `adjusted_close` is split/dividend adjusted. A provider that has a session
/// row but no usable close reports NaN; the resolver treats NaN as
/// unavailable rather than as a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingSession {
    pub calendar_date: NaiveDate,
    pub adjusted_close: f64,
}

impl TradingSession {
    pub fn new(calendar_date: NaiveDate, adjusted_close: f64) -> Self {
        Self {
            calendar_date,
            adjusted_close,
        }
    }

    /// Returns true if the close is missing (NaN or infinite).
    pub fn is_void(&self) -> bool {
        !self.adjusted_close.is_finite()
    }

    /// The close, or `None` when the session is void.
    pub fn close(&self) -> Option<f64> {
        if self.is_void() {
            None
        } else {
            Some(self.adjusted_close)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_close_is_void() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let session = TradingSession::new(date, f64::NAN);
        assert!(session.is_void());
        assert_eq!(session.close(), None);
    }

    #[test]
    fn zero_close_is_a_price() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let session = TradingSession::new(date, 0.0);
        assert_eq!(session.close(), Some(0.0));
    }
}
