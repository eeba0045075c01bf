use chrono::NaiveDateTime;

use crate::format::format_timestamp;

/// Running totals for one PID across every snapshot it appeared in.
///
/// `cpu_accumulated` and `memory_accumulated` are sums. The average is only
/// ever derived through [`ProcessSample::average`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_accumulated: f64,
    pub memory_accumulated: f64,
    pub sample_count: u64,
    pub last_seen: NaiveDateTime,
}

impl ProcessSample {
    pub fn create(
        pid: u32,
        name: impl Into<String>,
        cpu: f64,
        memory: f64,
        timestamp: NaiveDateTime,
    ) -> Self {
        ProcessSample {
            pid,
            name: name.into(),
            cpu_accumulated: cpu,
            memory_accumulated: memory,
            sample_count: 1,
            last_seen: timestamp,
        }
    }

    /// Adds one observation. The name recorded at creation is kept.
    pub fn fold(&mut self, cpu: f64, memory: f64, timestamp: NaiveDateTime) {
        self.cpu_accumulated += cpu;
        self.memory_accumulated += memory;
        self.sample_count += 1;
        self.last_seen = timestamp;
    }

    /// Returns `(avg_cpu, avg_memory_mb)`.
    pub fn average(&self) -> (f64, f64) {
        let n = self.sample_count as f64;
        (self.cpu_accumulated / n, self.memory_accumulated / n)
    }

    pub fn last_seen_label(&self) -> String {
        format_timestamp(&self.last_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_timestamp;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn create_starts_with_one_sample() {
        let sample = ProcessSample::create(3210, "test", 0.13, 98.3, ts("2025-01-01 11:59:00"));
        assert_eq!(sample.sample_count, 1);
        assert_eq!(sample.average(), (0.13, 98.3));
    }

    #[test]
    fn fold_accumulates_and_moves_last_seen() {
        let mut sample = ProcessSample::create(3210, "test", 0.13, 98.3, ts("2025-01-01 11:59:00"));
        sample.fold(0.42, 11.3, ts("2025-01-01 12:00:00"));

        assert!((sample.cpu_accumulated - 0.55).abs() < 1e-9);
        assert!((sample.memory_accumulated - 109.6).abs() < 1e-9);
        assert_eq!(sample.sample_count, 2);
        assert_eq!(sample.last_seen_label(), "2025-01-01 12:00:00");
    }

    #[test]
    fn fold_accepts_negative_values() {
        let mut sample = ProcessSample::create(1, "odd", 1.0, 1.0, ts("2025-01-01 00:00:00"));
        sample.fold(-3.0, -5.0, ts("2025-01-01 00:00:01"));
        assert_eq!(sample.average(), (-1.0, -2.0));
    }
}
