//! End-of-run summary table (SQLite)

use std::fs;
use std::path::Path;

use rusqlite::{Connection, params};

use super::SinkError;
use crate::system::process::ProcessSample;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS process_summary (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pid INTEGER NOT NULL,
    name TEXT NOT NULL,
    avg_cpu_usage REAL NOT NULL,
    avg_memory_usage REAL NOT NULL,
    sample_count INTEGER NOT NULL,
    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub id: i64,
    pub pid: u32,
    pub name: String,
    pub avg_cpu_usage: f64,
    pub avg_memory_usage: f64,
    pub sample_count: u64,
    pub last_updated: String,
}

pub struct SummaryDatabase {
    conn: Connection,
}

impl SummaryDatabase {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Writes one row per sample carrying its true averages.
    ///
    /// Dropping, creating and inserting share one transaction: on any error
    /// nothing is committed and the previous table is left untouched.
    pub fn export(
        &mut self,
        samples: &[ProcessSample],
        drop_existing: bool,
    ) -> Result<usize, SinkError> {
        let tx = self.conn.transaction()?;
        if drop_existing {
            tx.execute("DROP TABLE IF EXISTS process_summary", [])?;
        }
        tx.execute_batch(CREATE_TABLE)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO process_summary
                 (pid, name, avg_cpu_usage, avg_memory_usage, sample_count, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for sample in samples {
                let (avg_cpu, avg_memory) = sample.average();
                stmt.execute(params![
                    sample.pid,
                    sample.name,
                    avg_cpu,
                    avg_memory,
                    sample.sample_count as i64,
                    sample.last_seen_label(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(samples.len())
    }

    pub fn summaries(&self) -> rusqlite::Result<Vec<SummaryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pid, name, avg_cpu_usage, avg_memory_usage, sample_count, last_updated
             FROM process_summary ORDER BY id",
        )?;
        let rows = stmt.query_map([], Self::map_summary)?;
        rows.collect()
    }

    fn map_summary(row: &rusqlite::Row) -> rusqlite::Result<SummaryRow> {
        Ok(SummaryRow {
            id: row.get(0)?,
            pid: row.get(1)?,
            name: row.get(2)?,
            avg_cpu_usage: row.get(3)?,
            avg_memory_usage: row.get(4)?,
            sample_count: row.get::<_, i64>(5)? as u64,
            last_updated: row.get(6)?,
        })
    }
}
