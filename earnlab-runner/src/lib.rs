//! EarnLab Runner: batch configuration, logging, orchestration, summaries.
//!
//! This crate builds on `earnlab-core` to provide:
//! - TOML batch configuration with validation
//! - `tracing` subscriber setup with an optional per-run log file
//! - The per-entity pipeline and its typed outcomes
//! - A bounded worker pool over the entity universe
//! - The `_summary.json` batch artifact

pub mod batch;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod sources;
pub mod summary;

pub use batch::{execute, execute_with, BatchInputs, BatchOutput, RunError};
pub use config::{BatchConfig, ConfigError, LogFormat, LoggingConfig, PriceSourceConfig};
pub use logging::{init_logging, LoggingError, LOG_FILE};
pub use orchestrator::{
    run_batch, BatchError, BatchProgress, BatchReport, NoProgress, TracingProgress,
};
pub use pipeline::{
    price_window, process_entity, AlignmentStats, EntityError, EntityOutcome, EntityState,
    FailureKind, PipelineContext,
};
pub use summary::{read_summary, write_summary, BatchSummary, SummaryError, SUMMARY_FILE};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn outcomes_are_send_sync() {
        assert_send::<EntityOutcome>();
        assert_sync::<EntityOutcome>();
        assert_send::<EntityError>();
        assert_sync::<EntityError>();
    }

    #[test]
    fn pipeline_context_is_shareable() {
        assert_sync::<PipelineContext<'static>>();
        assert_send::<&PipelineContext<'static>>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BatchConfig>();
        assert_sync::<BatchConfig>();
        assert_send::<BatchSummary>();
        assert_sync::<BatchSummary>();
    }

    #[test]
    fn progress_reporters_are_send_sync() {
        assert_send::<TracingProgress>();
        assert_sync::<TracingProgress>();
    }
}
