//! Row sinks for export operations
//!
//! A sink is opened once, receives the header row, then one `write_rows`
//! call per batch. Rows are flushed before `write_rows` returns, so nothing
//! from a finished batch stays buffered in memory.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufWriter;

use crate::error::{Result, SinkError};

use super::flatten::OutputRow;

pub mod csv;

pub use csv::CsvWriter;

/// Trait for append-only row destinations
#[async_trait]
pub trait RowSink: Send {
    /// Write the header row
    ///
    /// # Arguments
    /// * `columns` - Column names in output order
    async fn write_header(&mut self, columns: &[&str]) -> Result<()>;

    /// Append one batch of rows and flush them
    ///
    /// # Returns
    /// * `Result<usize>` - Number of rows written
    async fn write_rows(&mut self, rows: &[OutputRow]) -> Result<usize>;

    /// Flush buffers and release the destination
    async fn finalize(&mut self) -> Result<()>;

    /// Current size of the destination in bytes
    async fn file_size(&self) -> Result<u64>;
}

/// Helper function to create a buffered file writer
///
/// # Arguments
/// * `path` - File path to create
///
/// # Returns
/// * `Result<BufWriter<File>>` - Buffered writer or error
pub(crate) async fn create_writer(path: &str) -> Result<BufWriter<File>> {
    let file = File::create(path).await.map_err(|source| SinkError::Create {
        path: path.to_string(),
        source,
    })?;
    Ok(BufWriter::with_capacity(1024 * 1024, file))
}

/// Helper function to validate file path and directory
///
/// # Arguments
/// * `path` - File path to validate
///
/// # Returns
/// * `Result<()>` - Success or error
pub(crate) fn validate_path(path: &str) -> Result<()> {
    let path_obj = Path::new(path);

    // Check if parent directory exists
    if let Some(parent) = path_obj.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(SinkError::DirectoryNotFound(parent.display().to_string()).into());
        }
    }

    Ok(())
}
