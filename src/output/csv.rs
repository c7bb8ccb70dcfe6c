//! CSV output writer with a collection-time metadata line

use chrono::{DateTime, TimeDelta, Utc};
use csv::{Terminator, Writer, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult};
use crate::series::Table;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Korea Standard Time, UTC+09:00
const KST_OFFSET_SECS: i64 = 9 * 3600;

/// Key of the metadata line written before the header row
pub const METADATA_KEY: &str = "# collected_at_kst";

/// Format `collected_at` as `YYYY-MM-DD HH:MM:SS KST`
pub fn format_kst(collected_at: DateTime<Utc>) -> String {
    let kst = collected_at.naive_utc() + TimeDelta::seconds(KST_OFFSET_SECS);
    kst.format("%Y-%m-%d %H:%M:%S KST").to_string()
}

/// CSV writer for one table file
pub struct CsvTableWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvTableWriter {
    /// Create the file (and its parent directories) and write the metadata line
    ///
    /// # Arguments
    /// * `path` - Output file path; an existing file is truncated
    /// * `collected_at` - Collection instant recorded in the metadata line
    pub fn new<P: AsRef<Path>>(path: P, collected_at: DateTime<Utc>) -> OutputResult<Self> {
        let path = path.as_ref();
        debug!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        let mut buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        writeln!(buf_writer, "{},{}", METADATA_KEY, format_kst(collected_at))
            .map_err(|e| OutputError::IoError(format!("Failed to write metadata: {e}")))?;

        let writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(buf_writer);

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write the header row
    pub fn write_header(&mut self, columns: &[String]) -> OutputResult<()> {
        self.writer
            .write_record(columns)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))
    }

    /// Write one data row
    pub fn write_row(&mut self, row: &[String]) -> OutputResult<()> {
        self.writer
            .write_record(row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Get number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and sync the file to disk
    pub fn close(mut self) -> OutputResult<u64> {
        self.writer
            .flush()
            .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        Ok(self.rows_written)
    }
}

/// Write `table` to `path`, preceded by the metadata line
///
/// # Returns
/// Number of data rows written
pub fn write_with_metadata(
    path: &Path,
    table: &Table,
    collected_at: DateTime<Utc>,
) -> OutputResult<u64> {
    let mut writer = CsvTableWriter::new(path, collected_at)?;
    writer.write_header(&table.columns)?;
    for row in &table.rows {
        writer.write_row(row)?;
    }
    let rows = writer.close()?;
    info!("Saved {} ({} rows)", path.display(), rows);
    Ok(rows)
}
