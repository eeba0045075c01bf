#![allow(dead_code)]

use std::collections::HashMap;

use proctally::system::source::{ProcessEntry, ProcessError, ProcessSource};

/// When a scripted process stops being readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fate {
    Alive,
    /// Listed, then gone before the CPU baseline.
    GoneBeforePrime,
    /// Primed, then gone before measurement.
    GoneBeforeMeasure,
    /// Listed but never readable.
    Denied,
}

#[derive(Clone, Debug)]
pub struct FakeProcess {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub fate: Fate,
}

pub fn mock_process(pid: u32, name: &str, cpu_percent: f32, memory_mb: f64) -> FakeProcess {
    FakeProcess {
        pid,
        name: name.to_string(),
        cpu_percent,
        memory_bytes: mb(memory_mb),
        fate: Fate::Alive,
    }
}

pub fn mb(megabytes: f64) -> u64 {
    (megabytes * 1_048_576.0) as u64
}

/// Process table with fixed readings. Names can change from a given
/// snapshot onwards; everything else stays the same.
pub struct ScriptedSource {
    processes: Vec<FakeProcess>,
    logical_cpus: usize,
    measuring: bool,
    snapshots: usize,
    renames: HashMap<u32, (usize, String)>,
}

impl ScriptedSource {
    pub fn new(processes: Vec<FakeProcess>) -> Self {
        Self::with_cpus(processes, 1)
    }

    pub fn with_cpus(processes: Vec<FakeProcess>, logical_cpus: usize) -> Self {
        ScriptedSource {
            processes,
            logical_cpus,
            measuring: false,
            snapshots: 0,
            renames: HashMap::new(),
        }
    }

    /// From the `snapshot`-th enumeration (1-based) on, `pid` reports `name`.
    pub fn rename_from(mut self, pid: u32, snapshot: usize, name: &str) -> Self {
        self.renames.insert(pid, (snapshot, name.to_string()));
        self
    }

    fn current_name(&self, process: &FakeProcess) -> String {
        match self.renames.get(&process.pid) {
            Some((from, name)) if self.snapshots >= *from => name.clone(),
            _ => process.name.clone(),
        }
    }

    /// The three processes used across the end-to-end scenarios.
    pub fn three_processes() -> Self {
        Self::new(vec![
            mock_process(1, "p1", 0.0, 93.9),
            mock_process(2, "p2", 1.30, 38.2),
            mock_process(3, "p3", 1.0, 21.5),
        ])
    }

    fn lookup(&self, pid: u32) -> Result<&FakeProcess, ProcessError> {
        let process = self
            .processes
            .iter()
            .find(|p| p.pid == pid)
            .ok_or(ProcessError::NotFound(pid))?;
        match process.fate {
            Fate::Alive => Ok(process),
            Fate::GoneBeforePrime => Err(ProcessError::NotFound(pid)),
            Fate::GoneBeforeMeasure if self.measuring => Err(ProcessError::NotFound(pid)),
            Fate::GoneBeforeMeasure => Ok(process),
            Fate::Denied => Err(ProcessError::AccessDenied(pid)),
        }
    }
}

impl ProcessSource for ScriptedSource {
    fn enumerate(&mut self) -> Vec<ProcessEntry> {
        self.measuring = false;
        self.snapshots += 1;
        self.processes
            .iter()
            .map(|p| ProcessEntry {
                pid: p.pid,
                name: self.current_name(p),
            })
            .collect()
    }

    fn prime_cpu(&mut self, pid: u32) -> Result<(), ProcessError> {
        self.lookup(pid).map(|_| ())
    }

    fn refresh(&mut self, _pids: &[u32]) {
        self.measuring = true;
    }

    fn name(&self, pid: u32) -> Result<String, ProcessError> {
        self.lookup(pid).map(|p| self.current_name(p))
    }

    fn cpu_percent(&self, pid: u32) -> Result<f32, ProcessError> {
        self.lookup(pid).map(|p| p.cpu_percent)
    }

    fn memory_resident_bytes(&self, pid: u32) -> Result<u64, ProcessError> {
        self.lookup(pid).map(|p| p.memory_bytes)
    }

    fn logical_cpus(&self) -> usize {
        self.logical_cpus
    }
}

/// One parsed CSV data row: (pid, name, cpu, memory, date).
pub type CsvRow = (u32, String, f64, f64, String);

pub fn read_csv(path: &std::path::Path) -> (String, Vec<CsvRow>) {
    let contents = std::fs::read_to_string(path).expect("csv should exist");
    let mut lines = contents.lines();
    let header = lines.next().unwrap_or_default().to_string();
    let rows: Vec<CsvRow> = lines
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 5, "malformed row: {line}");
            (
                fields[0].parse::<u32>().unwrap(),
                fields[1].to_string(),
                fields[2].parse::<f64>().unwrap(),
                fields[3].parse::<f64>().unwrap(),
                fields[4].to_string(),
            )
        })
        .collect();
    (header, rows)
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-5
}
