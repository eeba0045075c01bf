use chrono::{Local, NaiveDateTime, ParseResult, Timelike};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Spreads a raw per-process CPU reading over all logical CPUs so the result
/// stays in 0..=100 regardless of core count.
pub fn normalize_cpu(raw_percent: f32, logical_cpus: usize) -> f64 {
    f64::from(raw_percent) / logical_cpus.max(1) as f64
}

/// Local wall-clock time truncated to whole seconds.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}
