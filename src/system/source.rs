use thiserror::Error;

/// Why a single process could not be read. Both cases are handled the same
/// way by the collector: the process is skipped for this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("process {0} no longer exists")]
    NotFound(u32),
    #[error("access denied to process {0}")]
    AccessDenied(u32),
}

/// A live process as seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Operating-system process table, reduced to what a two-phase CPU sample
/// needs.
///
/// CPU percentages are rates: `cpu_percent` reports usage since the previous
/// `prime_cpu`/`refresh` pass on the same PID, so callers must prime, wait,
/// refresh, and only then read.
pub trait ProcessSource {
    /// Lists the processes alive right now.
    fn enumerate(&mut self) -> Vec<ProcessEntry>;

    /// Establishes the CPU baseline for `pid`.
    fn prime_cpu(&mut self, pid: u32) -> Result<(), ProcessError>;

    /// Re-reads counters for `pids` in one pass after the settling delay.
    fn refresh(&mut self, pids: &[u32]);

    fn name(&self, pid: u32) -> Result<String, ProcessError>;

    /// Raw CPU percentage; may exceed 100 on multi-core machines.
    fn cpu_percent(&self, pid: u32) -> Result<f32, ProcessError>;

    fn memory_resident_bytes(&self, pid: u32) -> Result<u64, ProcessError>;

    fn logical_cpus(&self) -> usize;
}
