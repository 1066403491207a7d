//! Snapshot sinks.
//!
//! The dispatch loop hands every emitted [`MbpSnapshot`] to a
//! [`SnapshotSink`] in emission order. `Vec<MbpSnapshot>` collects them in
//! memory; [`CsvSink`] writes the MBP-10 text format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::csv_codec::{format_mbp_line, mbp_header, CsvFormat};
use crate::error::Result;
use crate::loader::IO_BUFFER_SIZE;
use crate::types::MbpSnapshot;

/// Receiver of emitted snapshots.
pub trait SnapshotSink {
    /// Accept the next snapshot.
    fn write_snapshot(&mut self, snapshot: &MbpSnapshot) -> Result<()>;

    /// Called once after the last snapshot.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SnapshotSink for Vec<MbpSnapshot> {
    fn write_snapshot(&mut self, snapshot: &MbpSnapshot) -> Result<()> {
        self.push(snapshot.clone());
        Ok(())
    }
}

/// Discards snapshots. Useful for benchmarks and dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink {
    /// Snapshots seen
    pub count: u64,
}

impl SnapshotSink for NullSink {
    fn write_snapshot(&mut self, _snapshot: &MbpSnapshot) -> Result<()> {
        self.count += 1;
        Ok(())
    }
}

/// Writes MBP-10 rows to any `Write`.
///
/// The header goes out with the first row (or on `finish` for an empty
/// run). Rows are numbered from 0.
pub struct CsvSink<W: Write> {
    writer: W,
    format: CsvFormat,
    rows_written: u64,
    header_written: bool,
}

impl CsvSink<BufWriter<File>> {
    /// Create (truncate) `path` and write to it through a 1 MB buffer.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::with_capacity(IO_BUFFER_SIZE, file)))
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer with the default number format.
    pub fn new(writer: W) -> Self {
        Self::with_format(writer, CsvFormat::default())
    }

    /// Wrap a writer with a custom number format.
    pub fn with_format(writer: W, format: CsvFormat) -> Self {
        Self {
            writer,
            format,
            rows_written: 0,
            header_written: false,
        }
    }

    /// Data rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Unwrap the inner writer. Call [`SnapshotSink::finish`] first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{}", mbp_header())?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> SnapshotSink for CsvSink<W> {
    fn write_snapshot(&mut self, snapshot: &MbpSnapshot) -> Result<()> {
        self.ensure_header()?;
        let line = format_mbp_line(snapshot, self.rows_written, &self.format);
        writeln!(self.writer, "{line}")?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.ensure_header()?;
        self.writer.flush()?;
        Ok(())
    }
}
