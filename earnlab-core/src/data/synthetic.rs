//! Synthetic price provider for offline development.
//!
//! Produces a random walk over weekdays starting at 100.0, seeded from the
//! BLAKE3 hash of the symbol so the same symbol and window always give the
//! same series. Records aligned on synthetic prices are for exercising the
//! pipeline only.

use super::provider::{DataError, DataSource, PriceProvider};
use crate::domain::TradingSession;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First date of the synthetic walk. Series for any window are slices of
/// one walk per symbol, so overlapping windows agree on every close.
const WALK_ORIGIN: (i32, u32, u32) = (1990, 1, 1);

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticPriceProvider;

impl SyntheticPriceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PriceProvider for SyntheticPriceProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch_sessions(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, DataError> {
        let (y, m, d) = WALK_ORIGIN;
        let origin = NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| DataError::Other("invalid synthetic origin".into()))?;
        Ok(generate_sessions(symbol, origin, start, end))
    }
}

/// Generate the walk from `origin` and keep the sessions inside `[start, end]`.
fn generate_sessions(
    symbol: &str,
    origin: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<TradingSession> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut sessions = Vec::new();
    let mut price = 100.0_f64;
    let mut current = origin;

    while current <= end {
        let weekday = current.weekday();
        if weekday != Weekday::Sat && weekday != Weekday::Sun {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            price *= 1.0 + daily_return;
            if current >= start {
                sessions.push(TradingSession::new(current, price));
            }
        }
        current += chrono::Duration::days(1);
    }

    sessions
}
