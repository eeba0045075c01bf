pub mod csv;
pub mod database;

use thiserror::Error;

use crate::system::process::ProcessSample;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("sink written before it was opened")]
    NotOpen,
}

/// Destination that receives one batch of rows per monitoring iteration.
pub trait BatchSink {
    /// Prepares the target, destroying any existing artifact first when
    /// `delete_existing` is set. Failure here aborts the run.
    fn open(&mut self, delete_existing: bool) -> Result<(), SinkError>;

    /// Appends `rows`, returning how many were written.
    fn write_batch(&mut self, rows: &[ProcessSample]) -> Result<usize, SinkError>;
}
