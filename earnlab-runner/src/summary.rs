//! Batch summary artifact (`_summary.json` in the run directory).

use crate::orchestrator::BatchReport;
use crate::pipeline::{EntityOutcome, EntityState, FailureKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the summary inside a run directory.
pub const SUMMARY_FILE: &str = "_summary.json";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("summary serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One failed entity with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub entity: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Per-entity line of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity: String,
    pub state: EntityState,
    /// Records written this run; `None` for cached and failed entities.
    pub records: Option<usize>,
    /// BLAKE3 of the entity file, when one exists.
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_date: NaiveDate,
    pub total: usize,
    pub cached: usize,
    pub aligned: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub failures: Vec<FailureEntry>,
    pub entities: Vec<EntityReport>,
}

impl BatchSummary {
    /// Summarize a report. `hash` looks up the content hash of an entity file.
    pub fn from_report(report: &BatchReport, hash: impl Fn(&str) -> Option<String>) -> Self {
        let mut summary = Self {
            run_date: report.run_date,
            total: report.outcomes.len(),
            cached: 0,
            aligned: 0,
            failed: 0,
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            failures: Vec::new(),
            entities: Vec::with_capacity(report.outcomes.len()),
        };

        for (entity, outcome) in &report.outcomes {
            let records = match outcome {
                EntityOutcome::Cached => {
                    summary.cached += 1;
                    None
                }
                EntityOutcome::Aligned(stats) => {
                    summary.aligned += 1;
                    Some(stats.records)
                }
                EntityOutcome::Failed(e) => {
                    summary.failed += 1;
                    summary.failures.push(FailureEntry {
                        entity: entity.clone(),
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                    None
                }
            };

            let content_hash = if outcome.is_success() {
                hash(entity)
            } else {
                None
            };

            summary.entities.push(EntityReport {
                entity: entity.clone(),
                state: outcome.state(),
                records,
                content_hash,
            });
        }

        summary
    }

    pub fn failed_entities(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.entity.as_str()).collect()
    }
}

/// Write the summary into `run_dir` atomically. Returns the file path.
pub fn write_summary(summary: &BatchSummary, run_dir: &Path) -> Result<PathBuf, SummaryError> {
    fs::create_dir_all(run_dir)?;
    let path = run_dir.join(SUMMARY_FILE);
    let tmp_path = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&tmp_path, json)?;
    if let Err(e) = fs::rename(&tmp_path, &path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(path)
}

/// Read a summary back from a run directory.
pub fn read_summary(run_dir: &Path) -> Result<BatchSummary, SummaryError> {
    let content = fs::read_to_string(run_dir.join(SUMMARY_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AlignmentStats, EntityError};
    use earnlab_core::data::DataError;
    use std::time::Duration;

    fn report() -> BatchReport {
        BatchReport {
            run_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            outcomes: vec![
                ("AAPL".into(), EntityOutcome::Cached),
                (
                    "MSFT".into(),
                    EntityOutcome::Aligned(AlignmentStats {
                        records: 4,
                        exhausted: 0,
                        partial: 1,
                    }),
                ),
                (
                    "NOPE".into(),
                    EntityOutcome::Failed(EntityError::EventFetch(DataError::SymbolNotFound {
                        symbol: "NOPE".into(),
                    })),
                ),
            ],
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn counts_and_failures() {
        let summary = BatchSummary::from_report(&report(), |s| Some(format!("hash-{s}")));
        assert_eq!(summary.total, 3);
        assert_eq!((summary.cached, summary.aligned, summary.failed), (1, 1, 1));
        assert_eq!(summary.elapsed_ms, 1500);
        assert_eq!(summary.failed_entities(), vec!["NOPE"]);
        assert_eq!(summary.failures[0].kind, FailureKind::Fetch);
        assert!(summary.failures[0].reason.contains("symbol not found"));

        assert_eq!(summary.entities[1].records, Some(4));
        assert_eq!(summary.entities[1].content_hash.as_deref(), Some("hash-MSFT"));
        assert_eq!(summary.entities[2].content_hash, None);
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let summary = BatchSummary::from_report(&report(), |_| None);
        let path = write_summary(&summary, dir.path()).unwrap();
        assert!(path.ends_with(SUMMARY_FILE));
        assert_eq!(read_summary(dir.path()).unwrap(), summary);

        let json = fs::read_to_string(path).unwrap();
        assert!(json.contains("\"state\": \"cached\""));
        assert!(json.contains("\"kind\": \"fetch\""));
    }
}
