use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error};

use super::history::AggregationStore;
use super::process::ProcessSample;
use super::source::{ProcessError, ProcessSource};
use crate::format::{bytes_to_megabytes, normalize_cpu, now_timestamp};

/// Pause between the CPU baseline pass and the measurement pass.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// One process as measured in a single snapshot, already normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub timestamp: NaiveDateTime,
}

impl Observation {
    /// A one-sample record, used when exporting per-snapshot deltas.
    pub fn to_sample(&self) -> ProcessSample {
        ProcessSample::create(
            self.pid,
            self.name.clone(),
            self.cpu_percent,
            self.memory_mb,
            self.timestamp,
        )
    }
}

pub struct Snapshot {
    /// What this snapshot measured.
    pub observations: Vec<Observation>,
    /// The whole store after folding, ordered by PID.
    pub aggregate: Vec<ProcessSample>,
    /// Processes dropped because they vanished or could not be read.
    pub skipped: usize,
}

pub struct SnapshotCollector {
    settle_delay: Duration,
}

impl Default for SnapshotCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCollector {
    pub fn new() -> Self {
        Self::with_settle_delay(DEFAULT_SETTLE_DELAY)
    }

    pub fn with_settle_delay(settle_delay: Duration) -> Self {
        SnapshotCollector { settle_delay }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Samples every live process whose name is not in `exclude` and folds
    /// the readings into `store`.
    ///
    /// A process that disappears or denies access in either pass is logged
    /// and skipped; it never fails the snapshot.
    pub fn collect<S: ProcessSource + ?Sized>(
        &self,
        source: &mut S,
        exclude: &HashSet<String>,
        store: &mut AggregationStore,
    ) -> Snapshot {
        let mut skipped = 0;

        let mut primed = Vec::new();
        for entry in source.enumerate() {
            if exclude.contains(&entry.name) {
                continue;
            }
            match source.prime_cpu(entry.pid) {
                Ok(()) => primed.push(entry.pid),
                Err(e) => {
                    error!("Process access error during initialization: {e}");
                    skipped += 1;
                }
            }
        }

        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        source.refresh(&primed);
        let logical_cpus = source.logical_cpus();

        let mut observations = Vec::with_capacity(primed.len());
        for pid in primed {
            match measure(source, pid, logical_cpus) {
                Ok(observation) => {
                    store.record(
                        observation.pid,
                        &observation.name,
                        observation.cpu_percent,
                        observation.memory_mb,
                        observation.timestamp,
                    );
                    observations.push(observation);
                }
                Err(e) => {
                    error!("Process access error during data collection: {e}");
                    skipped += 1;
                }
            }
        }

        debug!(
            measured = observations.len(),
            skipped,
            tracked = store.len(),
            "snapshot collected"
        );

        Snapshot {
            observations,
            aggregate: store.samples(),
            skipped,
        }
    }
}

fn measure<S: ProcessSource + ?Sized>(
    source: &S,
    pid: u32,
    logical_cpus: usize,
) -> Result<Observation, ProcessError> {
    let name = source.name(pid)?;
    let cpu_percent = normalize_cpu(source.cpu_percent(pid)?, logical_cpus);
    let memory_mb = bytes_to_megabytes(source.memory_resident_bytes(pid)?);
    Ok(Observation {
        pid,
        name,
        cpu_percent,
        memory_mb,
        timestamp: now_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::system::source::ProcessEntry;

    /// Records the order of calls so the protocol can be checked.
    #[derive(Default)]
    struct TracingSource {
        procs: HashMap<u32, (String, f32, u64)>,
        calls: Vec<String>,
    }

    impl ProcessSource for TracingSource {
        fn enumerate(&mut self) -> Vec<ProcessEntry> {
            self.calls.push("enumerate".into());
            let mut entries: Vec<ProcessEntry> = self
                .procs
                .iter()
                .map(|(&pid, (name, _, _))| ProcessEntry {
                    pid,
                    name: name.clone(),
                })
                .collect();
            entries.sort_by_key(|e| e.pid);
            entries
        }

        fn prime_cpu(&mut self, pid: u32) -> Result<(), ProcessError> {
            self.calls.push(format!("prime {pid}"));
            Ok(())
        }

        fn refresh(&mut self, pids: &[u32]) {
            self.calls.push(format!("refresh {pids:?}"));
        }

        fn name(&self, pid: u32) -> Result<String, ProcessError> {
            Ok(self.procs[&pid].0.clone())
        }

        fn cpu_percent(&self, pid: u32) -> Result<f32, ProcessError> {
            Ok(self.procs[&pid].1)
        }

        fn memory_resident_bytes(&self, pid: u32) -> Result<u64, ProcessError> {
            Ok(self.procs[&pid].2)
        }

        fn logical_cpus(&self) -> usize {
            4
        }
    }

    #[test]
    fn primes_before_refresh_and_skips_excluded() {
        let mut source = TracingSource::default();
        source.procs.insert(1, ("keep".into(), 40.0, 2 * 1_048_576));
        source.procs.insert(2, ("drop".into(), 80.0, 1_048_576));

        let exclude: HashSet<String> = ["drop".to_string()].into_iter().collect();
        let mut store = AggregationStore::new();
        let collector = SnapshotCollector::with_settle_delay(Duration::ZERO);
        let snapshot = collector.collect(&mut source, &exclude, &mut store);

        assert_eq!(source.calls, vec!["enumerate", "prime 1", "refresh [1]"]);
        assert_eq!(snapshot.observations.len(), 1);
        assert_eq!(snapshot.observations[0].cpu_percent, 10.0);
        assert_eq!(snapshot.observations[0].memory_mb, 2.0);
        assert_eq!(snapshot.skipped, 0);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn default_settle_delay_is_one_second() {
        assert_eq!(SnapshotCollector::new().settle_delay(), Duration::from_secs(1));
    }
}
