//! Parallel execution of independent backtests.
//!
//! Each job owns its configuration and shares its candles through an [`Arc`]; runs never
//! observe each other. Jobs are split into one chunk per CPU and handed to rayon.

use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::config::BacktestConfig;
use crate::engine::{Backtest, BacktestReport, Candle, Strategy};
use crate::errors::Result;

/// One run of a batch.
#[derive(Debug, Clone)]
pub struct BatchJob {
    label: String,
    config: BacktestConfig,
    candles: Arc<[Candle]>,
}

impl BatchJob {
    /// Creates a job; `candles` can be shared between jobs.
    pub fn new(label: impl Into<String>, config: BacktestConfig, candles: Arc<[Candle]>) -> Self {
        Self {
            label: label.into(),
            config,
            candles,
        }
    }

    /// Name reported with the job's result.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Configuration of the run.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Candles replayed by the run.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    fn run<S: Strategy>(&self, strategy: S) -> Result<BacktestReport> {
        Backtest::new(self.config.clone(), strategy)?.run(self.candles.iter().copied())
    }
}

/// Runs every job in parallel.
///
/// `make_strategy` builds a fresh strategy per job. Results come back in input order,
/// one per job; a failing job does not stop the others.
pub fn run_batch<S, F>(jobs: &[BatchJob], make_strategy: F) -> Vec<(String, Result<BacktestReport>)>
where
    S: Strategy,
    F: Fn(&BatchJob) -> S + Sync,
{
    let num_cpus = num_cpus::get();
    let chunk_size = jobs.len().div_ceil(num_cpus).max(1);
    debug!("batch of {} jobs, chunks of {chunk_size}", jobs.len());

    jobs.par_chunks(chunk_size)
        .map(|chunk| {
            chunk
                .iter()
                .map(|job| (job.label.clone(), job.run(make_strategy(job))))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
