//! CSV writer for export operations
//!
//! Writes UTF-8 with a leading byte-order mark so spreadsheet tools pick the
//! right encoding, comma delimited, with standard quoting: fields holding a
//! comma, quote or line break are quoted and embedded quotes are doubled.

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::config::LineEnding;
use crate::error::{Result, SinkError};
use crate::export::flatten::OutputRow;

use super::{RowSink, create_writer, validate_path};

/// UTF-8 byte-order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writer for CSV format
pub struct CsvWriter {
    /// Buffered file writer
    writer: BufWriter<File>,
    /// Path to the output file
    path: String,
    /// Row terminator
    line_ending: LineEnding,
    /// Number of data rows written
    written: u64,
}

impl CsvWriter {
    /// Create the output file and write the byte-order mark
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `line_ending` - Row terminator used for every row
    ///
    /// # Returns
    /// * `Result<Self>` - New writer instance or error
    pub async fn open(path: &str, line_ending: LineEnding) -> Result<Self> {
        validate_path(path)?;
        let mut writer = create_writer(path).await?;
        writer
            .write_all(UTF8_BOM)
            .await
            .map_err(|source| SinkError::Write {
                path: path.to_string(),
                source,
            })?;

        debug!("Created CSV writer for: {}", path);

        Ok(Self {
            writer,
            path: path.to_string(),
            line_ending,
            written: 0,
        })
    }

    /// Data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.written
    }

    /// Append one encoded record to `buf`
    fn encode_record<S: AsRef<str>>(&self, fields: &[S], buf: &mut String) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                buf.push(',');
            }
            buf.push_str(&Self::escape_csv_value(field.as_ref()));
        }
        buf.push_str(self.line_ending.as_str());
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|source| self.write_error(source))
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> crate::error::ExportError {
        SinkError::Write {
            path: self.path.clone(),
            source,
        }
        .into()
    }

    /// Escape a CSV value if necessary
    ///
    /// # Arguments
    /// * `value` - Value to escape
    ///
    /// # Returns
    /// * `String` - Escaped value
    fn escape_csv_value(value: &str) -> String {
        if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
        {
            // Wrap in quotes and escape internal quotes by doubling them
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

#[async_trait]
impl RowSink for CsvWriter {
    async fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        let mut line = String::new();
        self.encode_record(columns, &mut line);
        self.write_bytes(line.as_bytes()).await?;
        self.flush().await?;
        debug!("Wrote CSV headers: {} fields", columns.len());
        Ok(())
    }

    async fn write_rows(&mut self, rows: &[OutputRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut chunk = String::new();
        for row in rows {
            self.encode_record(row.cells(), &mut chunk);
        }
        self.write_bytes(chunk.as_bytes()).await?;
        self.flush().await?;

        self.written += rows.len() as u64;
        debug!("Wrote {} rows to CSV (total: {})", rows.len(), self.written);

        Ok(rows.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.flush().await?;
        self.writer
            .shutdown()
            .await
            .map_err(|source| self.write_error(source))?;

        debug!("Finalized CSV file: {} ({} rows)", self.path, self.written);
        Ok(())
    }

    async fn file_size(&self) -> Result<u64> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|source| self.write_error(source))?;
        Ok(metadata.len())
    }
}
