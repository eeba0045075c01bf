use std::collections::HashMap;

use chrono::NaiveDateTime;

use super::process::ProcessSample;

/// PID-keyed running aggregate for one monitoring run.
///
/// Entries are never evicted: a PID that exits keeps its totals until the
/// store is dropped. PIDs recycled by the OS within a run fold into the old
/// entry.
#[derive(Debug, Default)]
pub struct AggregationStore {
    entries: HashMap<u32, ProcessSample>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds into the existing sample for `pid`, or creates one.
    pub fn record(
        &mut self,
        pid: u32,
        name: &str,
        cpu: f64,
        memory: f64,
        timestamp: NaiveDateTime,
    ) -> &ProcessSample {
        self.entries
            .entry(pid)
            .and_modify(|sample| sample.fold(cpu, memory, timestamp))
            .or_insert_with(|| ProcessSample::create(pid, name, cpu, memory, timestamp))
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessSample> {
        self.entries.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessSample> {
        self.entries.values()
    }

    /// Every sample, ordered by PID.
    pub fn samples(&self) -> Vec<ProcessSample> {
        let mut samples: Vec<ProcessSample> = self.entries.values().cloned().collect();
        samples.sort_by_key(|s| s.pid);
        samples
    }
}
