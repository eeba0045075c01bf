use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System};

use super::source::{ProcessEntry, ProcessError, ProcessSource};

/// [`ProcessSource`] backed by `sysinfo`.
///
/// `sysinfo` computes per-process CPU usage between two refreshes of the same
/// process, so `enumerate` doubles as the baseline pass for every process and
/// `prime_cpu` only checks that the PID is still present.
///
/// `sysinfo` does not surface permission errors; unreadable processes are
/// reported with zeroed counters rather than [`ProcessError::AccessDenied`].
pub struct OsProcessSource {
    sys: System,
}

impl Default for OsProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl OsProcessSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        OsProcessSource { sys }
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing().with_memory().with_cpu()
    }

    fn process(&self, pid: u32) -> Result<&Process, ProcessError> {
        self.sys
            .process(Pid::from_u32(pid))
            .ok_or(ProcessError::NotFound(pid))
    }
}

impl ProcessSource for OsProcessSource {
    fn enumerate(&mut self) -> Vec<ProcessEntry> {
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());

        self.sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
            })
            .collect()
    }

    fn prime_cpu(&mut self, pid: u32) -> Result<(), ProcessError> {
        self.process(pid).map(|_| ())
    }

    fn refresh(&mut self, pids: &[u32]) {
        let pids: Vec<Pid> = pids.iter().copied().map(Pid::from_u32).collect();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            true,
            Self::refresh_kind(),
        );
    }

    fn name(&self, pid: u32) -> Result<String, ProcessError> {
        self.process(pid)
            .map(|p| p.name().to_string_lossy().to_string())
    }

    fn cpu_percent(&self, pid: u32) -> Result<f32, ProcessError> {
        self.process(pid).map(Process::cpu_usage)
    }

    fn memory_resident_bytes(&self, pid: u32) -> Result<u64, ProcessError> {
        self.process(pid).map(Process::memory)
    }

    fn logical_cpus(&self) -> usize {
        self.sys.cpus().len().max(1)
    }
}
