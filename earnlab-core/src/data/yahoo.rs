//! Yahoo Finance price provider.
//!
//! Fetches daily adjusted closes from Yahoo's v8 chart API. One request per
//! call: failures are reported to the circuit breaker and surface as entity
//! failures, which the next batch run picks up through the record store.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The CSV import path is the fallback when Yahoo is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, PriceProvider};
use crate::domain::TradingSession;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
        })
    }

    /// Yahoo writes share classes with a dash (`BRK.B` → `BRK-B`).
    pub fn yahoo_symbol(symbol: &str) -> String {
        symbol.trim().replace(['.', '/'], "-")
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).map_or(0, |t| t.and_utc().timestamp());
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map_or(0, |t| t.and_utc().timestamp());
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true",
            Self::yahoo_symbol(symbol)
        )
    }

    /// Parse the chart API response into sessions.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<TradingSession>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // No timestamps: the symbol exists but did not trade in the window.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let closes = data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut sessions: Vec<TradingSession> = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = closes.get(i).copied().flatten();
            let adj_close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten());

            // Skip rows with no close at all (holidays Yahoo still lists)
            if close.is_none() && adj_close.is_none() {
                continue;
            }

            let session = TradingSession::new(date, adj_close.unwrap_or(f64::NAN));

            // Yahoo repeats the current day as a live row; the later row wins
            match sessions.last_mut() {
                Some(last) if last.calendar_date == date => *last = session,
                _ => sessions.push(session),
            }
        }

        Ok(sessions)
    }

    fn fetch_once(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, start, end);
        debug!(%symbol, %start, %end, "requesting yahoo chart");

        let resp = self.client.get(&url).send().map_err(|e| {
            self.circuit_breaker.record_failure();
            DataError::NetworkUnreachable(e.to_string())
        })?;

        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            ));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let sessions = Self::parse_response(symbol, chart)?;
        self.circuit_breaker.record_success();
        Ok(sessions)
    }
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch_sessions(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, DataError> {
        self.fetch_once(symbol, start, end)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<TradingSession>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("TEST", resp)
    }

    #[test]
    fn parses_adjusted_closes() {
        // 2024-01-02 and 2024-01-03, 14:30 UTC
        let sessions = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
                "indicators":{"quote":[{"close":[185.6,184.2]}],
                "adjclose":[{"adjclose":[184.9,183.5]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(
            sessions[0].calendar_date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(sessions[1].adjusted_close, 183.5);
    }

    #[test]
    fn rows_without_close_are_skipped() {
        let sessions = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
                "indicators":{"quote":[{"close":[null,184.2]}],
                "adjclose":[{"adjclose":[null,183.5]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn missing_adjclose_is_void_not_raw_close() {
        let sessions = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800],
                "indicators":{"quote":[{"close":[185.6]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert!(sessions[0].is_void());
    }

    #[test]
    fn repeated_day_keeps_the_live_row() {
        // 14:30 and 20:00 UTC on 2024-01-03
        let sessions = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704312000],
                "indicators":{"quote":[{"close":[185.6,184.2,184.9]}],
                "adjclose":[{"adjclose":[184.9,183.5,184.1]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(
            sessions[1].calendar_date,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
        assert_eq!(sessions[1].adjusted_close, 184.1);
    }

    #[test]
    fn no_timestamps_is_empty_series() {
        let sessions = parse(
            r#"{"chart":{"result":[{"indicators":{"quote":[{"close":[]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn not_found_maps_to_symbol_error() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn share_class_symbols_use_dash() {
        assert_eq!(YahooProvider::yahoo_symbol("BRK.B"), "BRK-B");
        assert_eq!(YahooProvider::yahoo_symbol("AAPL"), "AAPL");
    }
}
