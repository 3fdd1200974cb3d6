//! One complete batch run for a run date.
//!
//! Resolve the universe, run every entity, write `_summary.json`. The run
//! date is always passed in; nothing here reads the clock.

use crate::config::BatchConfig;
use crate::orchestrator::{run_batch, BatchError, BatchProgress, BatchReport};
use crate::pipeline::PipelineContext;
use crate::sources::{event_provider, price_provider, universe_resolver};
use crate::summary::{write_summary, BatchSummary, SummaryError};
use chrono::NaiveDate;
use earnlab_core::data::{
    CsvRecordStore, DataError, EventProvider, PriceProvider, UniverseResolver,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("data setup failed: {0}")]
    Data(#[from] DataError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// What a finished batch leaves behind.
#[derive(Debug)]
pub struct BatchOutput {
    pub report: BatchReport,
    pub summary: BatchSummary,
    pub summary_path: PathBuf,
}

/// Collaborators for one batch, wired explicitly so tests can substitute
/// their own.
pub struct BatchInputs<'a> {
    pub universe: &'a dyn UniverseResolver,
    pub events: &'a dyn EventProvider,
    pub prices: &'a dyn PriceProvider,
    pub store: &'a CsvRecordStore,
}

/// Run a batch with explicit collaborators.
pub fn execute_with(
    inputs: &BatchInputs<'_>,
    run_date: NaiveDate,
    workers: usize,
    window_padding_days: i64,
    progress: &dyn BatchProgress,
) -> Result<BatchOutput, RunError> {
    let universe = inputs.universe.resolve(run_date)?;
    info!(%run_date, entities = universe.len(), workers, "resolved universe");

    let ctx = PipelineContext {
        run_date,
        events: inputs.events,
        prices: inputs.prices,
        store: inputs.store,
        window_padding_days,
    };

    let report = run_batch(&ctx, &universe, workers, progress)?;
    let summary = BatchSummary::from_report(&report, |symbol| {
        inputs.store.content_hash(run_date, symbol).ok()
    });
    let summary_path = write_summary(&summary, &inputs.store.run_dir(run_date))?;
    progress.on_batch_complete(&summary);

    Ok(BatchOutput {
        report,
        summary,
        summary_path,
    })
}

/// Run a batch with the collaborators named in the configuration.
pub fn execute(
    config: &BatchConfig,
    run_date: NaiveDate,
    progress: &dyn BatchProgress,
) -> Result<BatchOutput, RunError> {
    let universe = universe_resolver(config)?;
    let events = event_provider(config);
    let prices = price_provider(config)?;
    let store = CsvRecordStore::new(&config.output_dir);

    let inputs = BatchInputs {
        universe: &universe,
        events: &events,
        prices: prices.as_ref(),
        store: &store,
    };
    execute_with(
        &inputs,
        run_date,
        config.workers,
        config.window_padding_days,
        progress,
    )
}
