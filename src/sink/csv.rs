use std::fs::{self, File, OpenOptions};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{BatchSink, SinkError};
use crate::system::process::ProcessSample;

pub const HEADER: &str = "pid,name,cpu,memoryInfo,date";

/// Append-only CSV history log.
///
/// Every batch is appended as-is, so writing the full aggregate each
/// iteration repeats PIDs across iterations. A batch is formatted up front
/// and handed to the file in a single write.
pub struct CsvSink {
    path: PathBuf,
    file: Option<File>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSink {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BatchSink for CsvSink {
    fn open(&mut self, delete_existing: bool) -> Result<(), SinkError> {
        if delete_existing && self.path.exists() {
            fs::remove_file(&self.path)?;
        }

        let file_exists = self.path.exists();
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if !file_exists {
            file.write_all(format!("{HEADER}\n").as_bytes())?;
        }
        self.file = Some(file);
        Ok(())
    }

    fn write_batch(&mut self, rows: &[ProcessSample]) -> Result<usize, SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::NotOpen)?;
        append_batch(file, rows)?;
        Ok(rows.len())
    }
}

fn append_batch<W: Write>(out: &mut W, rows: &[ProcessSample]) -> io::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    out.write_all(format_batch(rows).as_bytes())
}

fn format_batch(rows: &[ProcessSample]) -> String {
    let mut batch = String::new();
    for row in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(
            batch,
            "{},{},{},{},{}",
            row.pid,
            escape_field(&row.name),
            row.cpu_accumulated,
            row.memory_accumulated,
            row.last_seen_label()
        );
    }
    batch
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
