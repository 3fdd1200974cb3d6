//! CSV import providers.
//!
//! Event files: `{dir}/{SYMBOL}.csv` with header `date,time,eps_estimate,eps_actual`.
//! Two timing conventions are accepted and normalized into [`TimingTag`]:
//! - categorical: `time` is `BMO`, `AMC`, an hour, or an unknown marker;
//! - hourly: `date` carries the release time (`2024-01-25 16:30:00`) and
//!   `time` is empty or absent.
//!
//! Price files: `{dir}/{SYMBOL}.csv` with a `date` column and an adjusted
//! close column (`adj_close` or Yahoo's `Adj Close`).

use super::provider::{DataError, DataSource, EventProvider, PriceProvider};
use crate::align::UnknownTiming;
use crate::domain::{AnnouncementEvent, TimingTag, TradingSession};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// File name for a symbol. Path separators in symbols become dashes.
pub fn symbol_file_name(symbol: &str) -> String {
    format!("{}.csv", symbol.trim().replace(['/', '\\'], "-"))
}

fn open_reader(path: &Path, symbol: &str) -> Result<csv::Reader<std::fs::File>, DataError> {
    if !path.is_file() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| parse_error(path, e))
}

fn parse_error(path: &Path, reason: impl ToString) -> DataError {
    DataError::Parse {
        source_name: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn optional_f64(field: Option<&str>) -> Result<Option<f64>, String> {
    match field.map(str::trim) {
        None | Some("") | Some("--") | Some("N/A") => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|e| format!("invalid number '{s}': {e}")),
    }
}

/// Parse the `date` field of an event row, returning the hour when present.
fn parse_event_date(field: &str) -> Result<(NaiveDate, Option<u8>), String> {
    if let Ok(date) = NaiveDate::parse_from_str(field, DATE_FORMAT) {
        return Ok((date, None));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
        .map(|dt| (dt.date(), Some(dt.hour() as u8)))
        .ok_or_else(|| format!("invalid date '{field}'"))
}

/// Earnings events from per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvEventProvider {
    dir: PathBuf,
    unknown_timing: UnknownTiming,
}

impl CsvEventProvider {
    pub fn new(dir: impl Into<PathBuf>, unknown_timing: UnknownTiming) -> Self {
        Self {
            dir: dir.into(),
            unknown_timing,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl EventProvider for CsvEventProvider {
    fn name(&self) -> &str {
        "csv_events"
    }

    fn fetch_events(&self, symbol: &str) -> Result<Vec<AnnouncementEvent>, DataError> {
        let path = self.dir.join(symbol_file_name(symbol));
        let mut reader = open_reader(&path, symbol)?;
        let headers = reader.headers().map_err(|e| parse_error(&path, e))?.clone();

        let date_col = column(&headers, &["date", "earning date"])
            .ok_or_else(|| parse_error(&path, "missing 'date' column"))?;
        let time_col = column(&headers, &["time"]);
        let est_col = column(&headers, &["eps_estimate", "eps-e"]);
        let act_col = column(&headers, &["eps_actual", "eps-a"]);

        let mut events = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| parse_error(&path, e))?;
            let at = |msg: String| parse_error(&path, format!("row {}: {msg}", line + 1));

            let (date, hour) = parse_event_date(row.get(date_col).unwrap_or("")).map_err(at)?;

            let tag_field = time_col.and_then(|c| row.get(c)).unwrap_or("");
            let mut timing: TimingTag = tag_field.parse().map_err(|e| at(format!("{e}")))?;
            if timing == TimingTag::Unknown {
                if let Some(h) = hour {
                    timing = TimingTag::Hour(h);
                }
            }

            let estimated = optional_f64(est_col.and_then(|c| row.get(c))).map_err(at)?;
            let actual = optional_f64(act_col.and_then(|c| row.get(c))).map_err(at)?;

            events.push(
                AnnouncementEvent::new(symbol, date, timing).with_metrics(estimated, actual),
            );
        }

        // Some sources list newest first
        events.sort_by_key(|e| e.calendar_date);
        Ok(events)
    }

    fn unknown_timing(&self) -> UnknownTiming {
        self.unknown_timing
    }
}

/// Adjusted closes from per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PriceProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv_prices"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn fetch_sessions(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, DataError> {
        let path = self.dir.join(symbol_file_name(symbol));
        let mut reader = open_reader(&path, symbol)?;
        let headers = reader.headers().map_err(|e| parse_error(&path, e))?.clone();

        let date_col = column(&headers, &["date"])
            .ok_or_else(|| parse_error(&path, "missing 'date' column"))?;
        let close_col = column(&headers, &["adj_close", "adj close", "adjusted_close"])
            .ok_or_else(|| parse_error(&path, "missing adjusted close column"))?;

        let mut sessions = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| parse_error(&path, e))?;
            let raw_date = row.get(date_col).unwrap_or("");
            let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
                parse_error(&path, format!("row {}: invalid date '{raw_date}': {e}", line + 1))
            })?;
            if date < start || date > end {
                continue;
            }
            let close = optional_f64(row.get(close_col))
                .map_err(|e| parse_error(&path, format!("row {}: {e}", line + 1)))?;
            sessions.push(TradingSession::new(date, close.unwrap_or(f64::NAN)));
        }

        sessions.sort_by_key(|s| s.calendar_date);
        Ok(sessions)
    }
}
