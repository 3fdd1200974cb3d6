//! Batch orchestrator: fan the universe out over a bounded worker pool.
//!
//! Entities are independent. Each one runs its whole pipeline inside one
//! worker; a failure is recorded in its outcome and never stops the others.
//! The batch itself only fails if the pool cannot be built.

use crate::pipeline::{process_entity, EntityOutcome, PipelineContext};
use crate::summary::BatchSummary;
use chrono::NaiveDate;
use earnlab_core::data::EntityUniverse;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Callback trait for reporting batch progress.
pub trait BatchProgress: Send + Sync {
    /// Called once before any entity starts.
    fn on_start(&self, total: usize);

    /// Called when an entity reaches a terminal state. May be called from
    /// any worker thread.
    fn on_complete(&self, symbol: &str, outcome: &EntityOutcome);

    /// Called once after every worker has finished.
    fn on_batch_complete(&self, summary: &BatchSummary);
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchProgress for TracingProgress {
    fn on_start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        info!(total, "batch started");
    }

    fn on_complete(&self, symbol: &str, outcome: &EntityOutcome) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        match outcome {
            EntityOutcome::Cached => {
                tracing::debug!(entity = symbol, done, total, "already cached");
            }
            EntityOutcome::Aligned(stats) => {
                info!(
                    entity = symbol,
                    records = stats.records,
                    exhausted = stats.exhausted,
                    partial = stats.partial,
                    done,
                    total,
                    "aligned"
                );
            }
            EntityOutcome::Failed(e) => {
                warn!(entity = symbol, kind = ?e.kind(), error = %e, done, total, "failed");
            }
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        info!(
            run_date = %summary.run_date,
            total = summary.total,
            cached = summary.cached,
            aligned = summary.aligned,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "batch complete"
        );
        if !summary.failures.is_empty() {
            let names: Vec<&str> = summary.failures.iter().map(|f| f.entity.as_str()).collect();
            warn!("Failed list: {}", names.join(", "));
        }
    }
}

/// Progress sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl BatchProgress for NoProgress {
    fn on_start(&self, _total: usize) {}
    fn on_complete(&self, _symbol: &str, _outcome: &EntityOutcome) {}
    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}

/// Outcomes of one batch, in universe order.
#[derive(Debug)]
pub struct BatchReport {
    pub run_date: NaiveDate,
    pub outcomes: Vec<(String, EntityOutcome)>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Entities that ended in the failed state.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(s, _)| s.as_str())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_success())
    }
}

/// Run every entity of the universe through the pipeline.
///
/// At most `workers` entities are in flight at once. Returns after every
/// entity has reached a terminal state.
pub fn run_batch(
    ctx: &PipelineContext<'_>,
    universe: &EntityUniverse,
    workers: usize,
    progress: &dyn BatchProgress,
) -> Result<BatchReport, BatchError> {
    let start = Instant::now();
    let symbols = universe.symbols();
    progress.on_start(symbols.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("earnlab-worker-{i}"))
        .build()?;

    let outcomes: Vec<(String, EntityOutcome)> = pool.install(|| {
        symbols
            .par_iter()
            .map(|symbol| {
                let outcome = process_entity(ctx, symbol);
                progress.on_complete(symbol, &outcome);
                (symbol.to_string(), outcome)
            })
            .collect()
    });

    Ok(BatchReport {
        run_date: ctx.run_date,
        outcomes,
        elapsed: start.elapsed(),
    })
}
