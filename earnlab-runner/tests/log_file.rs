//! Per-run log file behaviour.
//!
//! Installing the subscriber is process-global, so this file holds a
//! single test.

use earnlab_runner::{init_logging, LoggingConfig, LOG_FILE};
use std::fs;

#[test]
fn rerun_appends_to_existing_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2024-06-03").join(LOG_FILE);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "first run: Failed list: KO\n").unwrap();

    init_logging(&LoggingConfig::default(), Some(&path)).unwrap();
    tracing::info!("second run started");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("first run: Failed list: KO\n"));
    assert!(content.contains("second run started"));
}
