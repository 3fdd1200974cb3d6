//! Record store: one CSV file per entity per run date.
//!
//! Layout: `{root}/{YYYY-MM-DD}/{SYMBOL}.csv`
//!
//! - Writes are atomic (write to `.tmp`, rename into place), so a file that
//!   exists is always complete.
//! - Nothing is ever invalidated. A present file means the entity is done
//!   for that run date.
//! - Unavailable closes are empty fields, never zero.
//! - Files whose name starts with `_` are run-level artifacts (universe,
//!   summary, log) and are not entities.

use super::csv_import::symbol_file_name;
use super::provider::DataError;
use crate::domain::{AlignedRecord, PriceWindow, SessionSide, TimingTag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Column order of an entity file.
pub const RECORD_COLUMNS: [&str; 9] = [
    "calendar_date",
    "timing",
    "session",
    "estimated_metric",
    "actual_metric",
    "prev_prev_close",
    "prev_close",
    "next_close",
    "next_next_close",
];

/// Persistent per-(run date, entity) record cache.
pub trait RecordStore: Send + Sync {
    /// Whether the entity has been completed for this run date.
    fn exists(&self, run_date: NaiveDate, entity_id: &str) -> bool;

    /// Persist an entity's records. Visible to `exists` only once complete.
    fn write(
        &self,
        run_date: NaiveDate,
        entity_id: &str,
        records: &[AlignedRecord],
    ) -> Result<(), DataError>;

    /// Read back an entity's records in emission order.
    fn read(&self, run_date: NaiveDate, entity_id: &str) -> Result<Vec<AlignedRecord>, DataError>;
}

/// One CSV row. Kept flat so the file stays a plain table.
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    calendar_date: NaiveDate,
    timing: String,
    session: String,
    estimated_metric: Option<f64>,
    actual_metric: Option<f64>,
    prev_prev_close: Option<f64>,
    prev_close: Option<f64>,
    next_close: Option<f64>,
    next_next_close: Option<f64>,
}

impl From<&AlignedRecord> for RecordRow {
    fn from(r: &AlignedRecord) -> Self {
        Self {
            calendar_date: r.calendar_date,
            timing: r.timing.to_string(),
            session: r.session.to_string(),
            estimated_metric: r.estimated_metric,
            actual_metric: r.actual_metric,
            prev_prev_close: r.prices.prev_prev_close,
            prev_close: r.prices.prev_close,
            next_close: r.prices.next_close,
            next_next_close: r.prices.next_next_close,
        }
    }
}

impl RecordRow {
    fn into_record(self, entity_id: &str) -> Result<AlignedRecord, String> {
        let timing: TimingTag = self.timing.parse().map_err(|e| format!("{e}"))?;
        let session: SessionSide = self.session.parse()?;
        Ok(AlignedRecord {
            entity_id: entity_id.to_string(),
            calendar_date: self.calendar_date,
            timing,
            session,
            estimated_metric: self.estimated_metric,
            actual_metric: self.actual_metric,
            prices: PriceWindow {
                prev_prev_close: self.prev_prev_close,
                prev_close: self.prev_close,
                next_close: self.next_close,
                next_next_close: self.next_next_close,
            },
        })
    }
}

/// The CSV record store.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    root: PathBuf,
}

impl CsvRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one run date: `{root}/{YYYY-MM-DD}/`
    pub fn run_dir(&self, run_date: NaiveDate) -> PathBuf {
        self.root.join(run_date.format("%Y-%m-%d").to_string())
    }

    /// Path of an entity file: `{root}/{YYYY-MM-DD}/{SYMBOL}.csv`
    pub fn entity_path(&self, run_date: NaiveDate, entity_id: &str) -> PathBuf {
        self.run_dir(run_date).join(symbol_file_name(entity_id))
    }

    /// Entities with a completed file for the run date, sorted.
    ///
    /// Names come from file stems, so a symbol written with `/` is listed
    /// with `-`.
    pub fn entities(&self, run_date: NaiveDate) -> Result<Vec<String>, DataError> {
        let dir = self.run_dir(run_date);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('_') {
                continue;
            }
            names.push(stem.to_string());
        }
        names.sort();
        Ok(names)
    }

    /// BLAKE3 hex digest of an entity file.
    pub fn content_hash(&self, run_date: NaiveDate, entity_id: &str) -> Result<String, DataError> {
        let path = self.entity_path(run_date, entity_id);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DataError::NoCachedData {
                    symbol: entity_id.to_string(),
                    run_date,
                }
            } else {
                DataError::CacheError(format!("read {}: {e}", path.display()))
            }
        })?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    fn write_file(path: &Path, records: &[AlignedRecord]) -> Result<(), DataError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| DataError::CacheError(format!("create {}: {e}", path.display())))?;

        // Header written by hand so entities without events still get one
        writer
            .write_record(RECORD_COLUMNS)
            .map_err(|e| DataError::CacheError(format!("write header: {e}")))?;
        for record in records {
            writer
                .serialize(RecordRow::from(record))
                .map_err(|e| DataError::CacheError(format!("write row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| DataError::CacheError(format!("flush: {e}")))
    }

    /// Parse an entity file without touching the cache, even when the
    /// file is unreadable. For inspection commands.
    pub fn peek(&self, run_date: NaiveDate, entity_id: &str) -> Result<Vec<AlignedRecord>, DataError> {
        let path = self.entity_path(run_date, entity_id);
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                symbol: entity_id.to_string(),
                run_date,
            });
        }
        Self::read_file(&path, entity_id)
    }

    fn read_file(path: &Path, entity_id: &str) -> Result<Vec<AlignedRecord>, DataError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| DataError::CacheError(format!("open {}: {e}", path.display())))?;

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<RecordRow>().enumerate() {
            let row = row.map_err(|e| DataError::Parse {
                source_name: path.display().to_string(),
                reason: format!("row {}: {e}", line + 1),
            })?;
            let record = row.into_record(entity_id).map_err(|reason| DataError::Parse {
                source_name: path.display().to_string(),
                reason: format!("row {}: {reason}", line + 1),
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl RecordStore for CsvRecordStore {
    fn exists(&self, run_date: NaiveDate, entity_id: &str) -> bool {
        self.entity_path(run_date, entity_id).is_file()
    }

    fn write(
        &self,
        run_date: NaiveDate,
        entity_id: &str,
        records: &[AlignedRecord],
    ) -> Result<(), DataError> {
        let dir = self.run_dir(run_date);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.entity_path(run_date, entity_id);
        let tmp_path = path.with_extension("csv.tmp");

        if let Err(e) = Self::write_file(&tmp_path, records) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        debug!(entity = entity_id, records = records.len(), path = %path.display(), "records written");
        Ok(())
    }

    fn read(&self, run_date: NaiveDate, entity_id: &str) -> Result<Vec<AlignedRecord>, DataError> {
        match self.peek(run_date, entity_id) {
            Ok(records) => Ok(records),
            Err(e @ DataError::NoCachedData { .. }) => Err(e),
            Err(e) => {
                let path = self.entity_path(run_date, entity_id);
                // Quarantine so the next run recomputes the entity
                let quarantine = path.with_extension("csv.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining unreadable record file");
                let _ = fs::rename(&path, &quarantine);
                Err(e)
            }
        }
    }
}
