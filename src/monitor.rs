use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::sink::{BatchSink, SinkError};
use crate::system::history::AggregationStore;
use crate::system::process::ProcessSample;
use crate::system::snapshot::SnapshotCollector;
use crate::system::source::ProcessSource;

/// What each iteration hands to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Every sample held by the store, with accumulated sums.
    #[default]
    Aggregate,
    /// Only the readings taken in this iteration.
    Delta,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("sampling interval must be greater than zero")]
    ZeroInterval,
    #[error("failed to open output: {0}")]
    Setup(#[source] SinkError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub batches_written: u64,
    pub batches_failed: u64,
    pub rows_written: u64,
}

/// Number of snapshots a run performs: whole intervals that fit in the
/// duration.
pub fn iteration_count(interval_secs: u64, duration_secs: u64) -> u64 {
    duration_secs.checked_div(interval_secs).unwrap_or(0)
}

/// Drives repeated snapshots for a bounded run and owns the aggregate.
///
/// There is no sleep between iterations other than the collector's settling
/// delay, so snapshots are spaced by that delay plus sampling time rather
/// than by the configured interval.
pub struct MonitorLoop<S: ProcessSource> {
    source: S,
    collector: SnapshotCollector,
    exclude: HashSet<String>,
    output_mode: OutputMode,
    store: AggregationStore,
}

impl<S: ProcessSource> MonitorLoop<S> {
    pub fn new<I>(source: S, collector: SnapshotCollector, exclude: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        MonitorLoop {
            source,
            collector,
            exclude: exclude.into_iter().map(Into::into).collect(),
            output_mode: OutputMode::default(),
            store: AggregationStore::new(),
        }
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn into_store(self) -> AggregationStore {
        self.store
    }

    /// Runs `duration_secs / interval_secs` snapshots, writing one batch to
    /// `sink` after each.
    ///
    /// Opening the sink is the only fatal step. A batch that fails to write
    /// is logged and the run moves on to the next iteration.
    pub fn run(
        &mut self,
        interval_secs: u64,
        duration_secs: u64,
        sink: &mut dyn BatchSink,
        delete_existing_output: bool,
    ) -> Result<RunSummary, MonitorError> {
        if interval_secs == 0 {
            return Err(MonitorError::ZeroInterval);
        }

        sink.open(delete_existing_output)
            .map_err(MonitorError::Setup)?;

        let iterations = iteration_count(interval_secs, duration_secs);
        let mut summary = RunSummary::default();

        for i in 1..=iterations {
            info!("Monitoring iteration {i} started");
            summary.iterations += 1;

            let snapshot = self
                .collector
                .collect(&mut self.source, &self.exclude, &mut self.store);
            let rows: Vec<ProcessSample> = match self.output_mode {
                OutputMode::Aggregate => snapshot.aggregate,
                OutputMode::Delta => snapshot
                    .observations
                    .iter()
                    .map(|o| o.to_sample())
                    .collect(),
            };

            match sink.write_batch(&rows) {
                Ok(written) => {
                    summary.batches_written += 1;
                    summary.rows_written += written as u64;
                    info!(
                        skipped = snapshot.skipped,
                        "Monitoring iteration {i} complete, total {written} processes"
                    );
                }
                Err(e) => {
                    summary.batches_failed += 1;
                    error!("Failed to write process data for iteration {i}: {e}");
                }
            }
        }

        Ok(summary)
    }
}
