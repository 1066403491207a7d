//! MBO text file loader and streaming interface.
//!
//! Streams [`MboEvent`]s from a comma-separated file without loading it
//! into memory:
//! - Large I/O buffer (1MB) for fewer syscalls
//! - Header line skipped, blank lines ignored
//! - Progress statistics (lines, events, bytes)
//! - The first malformed record ends the stream with an error
//!
//! # Example
//!
//! ```no_run
//! use mbo_mbp_reconstructor::{MboCsvLoader, MbpReconstructor};
//!
//! let loader = MboCsvLoader::new("data/ARL_2025-07-17.mbo.csv")?;
//! let mut reconstructor = MbpReconstructor::new();
//!
//! for event in loader.iter_events()? {
//!     let event = event?;
//!     for snapshot in reconstructor.process_event(&event) {
//!         // ... use snapshot ...
//!     }
//! }
//! let _trailing = reconstructor.finish();
//! # Ok::<(), mbo_mbp_reconstructor::MbpError>(())
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::csv_codec::parse_mbo_line;
use crate::error::{MbpError, Result};
use crate::types::MboEvent;

/// I/O buffer size for file reading.
///
/// Default `BufReader` uses 8KB; MBO day files run to hundreds of MB.
pub const IO_BUFFER_SIZE: usize = 1024 * 1024; // 1 MB

/// Statistics for MBO file loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Events successfully decoded
    pub events_read: u64,

    /// Lines consumed, including header and blank lines
    pub lines_read: u64,

    /// Blank lines skipped
    pub blank_lines: u64,

    /// Bytes consumed from the input
    pub bytes_read: u64,

    /// File size in bytes (0 when not reading from a file)
    pub file_size: u64,
}

/// MBO CSV file loader.
///
/// Handles file I/O and record decoding only. What the events mean for the
/// book is the reconstructor's business.
#[derive(Debug, Clone)]
pub struct MboCsvLoader {
    /// Path to the input file
    path: PathBuf,

    /// Statistics
    stats: LoaderStats,
}

impl MboCsvLoader {
    /// Create a new loader.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the MBO CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(MboCsvLoader)` - Loader ready to use
    /// * `Err(MbpError)` - File not found or not accessible
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(MbpError::generic(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let file_size = std::fs::metadata(&path)
            .map_err(|e| MbpError::generic(format!("Failed to read file metadata: {e}")))?
            .len();

        Ok(Self {
            path,
            stats: LoaderStats {
                file_size,
                ..Default::default()
            },
        })
    }

    /// Path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Statistics captured at construction (file size).
    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    /// Open the file and stream events.
    pub fn iter_events(self) -> Result<EventIterator<BufReader<File>>> {
        let file = File::open(&self.path)?;
        log::debug!(
            "Opened {} ({} bytes)",
            self.path.display(),
            self.stats.file_size
        );
        let reader = BufReader::with_capacity(IO_BUFFER_SIZE, file);
        Ok(EventIterator::with_stats(reader, self.stats))
    }

    /// Read all events into a Vec.
    ///
    /// **Warning**: This loads every event into memory at once.
    /// For large files, use `iter_events()` instead.
    pub fn read_all(self) -> Result<Vec<MboEvent>> {
        self.iter_events()?.collect()
    }
}

/// Streaming decoder over any buffered reader.
///
/// Yields `Ok(event)` per record. After the first `Err` (I/O or malformed
/// record) the iterator is exhausted.
pub struct EventIterator<R: BufRead> {
    reader: R,
    buf: String,
    stats: LoaderStats,
    header_skipped: bool,
    done: bool,
}

impl<R: BufRead> EventIterator<R> {
    /// Wrap a reader positioned at the header line.
    pub fn new(reader: R) -> Self {
        Self::with_stats(reader, LoaderStats::default())
    }

    fn with_stats(reader: R, stats: LoaderStats) -> Self {
        Self {
            reader,
            buf: String::with_capacity(256),
            stats,
            header_skipped: false,
            done: false,
        }
    }

    /// Get current statistics.
    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    /// Get progress as a percentage (0.0 to 100.0) of the file size.
    pub fn progress(&self) -> f64 {
        if self.stats.file_size == 0 {
            return 100.0;
        }
        (self.stats.bytes_read as f64 / self.stats.file_size as f64) * 100.0
    }

    /// Read the next line into `buf`. `Ok(false)` at end of input.
    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.stats.lines_read += 1;
        self.stats.bytes_read += n as u64;
        Ok(true)
    }

    fn next_event(&mut self) -> Result<Option<MboEvent>> {
        if !self.header_skipped {
            self.header_skipped = true;
            if !self.read_line()? {
                return Ok(None);
            }
        }

        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if self.buf.trim().is_empty() {
                self.stats.blank_lines += 1;
                continue;
            }
            let event = parse_mbo_line(&self.buf, self.stats.lines_read)?;
            self.stats.events_read += 1;
            return Ok(Some(event));
        }
    }
}

impl<R: BufRead> Iterator for EventIterator<R> {
    type Item = Result<MboEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                log::error!("Stopping input: {e}");
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Side};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn unique_temp_dir(test_name: &str) -> PathBuf {
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "loader_test_{}_{}_{}",
            std::process::id(),
            test_name,
            counter
        ))
    }

    const HEADER: &str = "ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,price,size,channel_id,order_id,flags,ts_in_delta,sequence,symbol\n";

    fn sample_input() -> String {
        let mut text = String::from(HEADER);
        text.push_str("t0,t0,160,2,1108,R,N,,0,0,0,8,0,0,ARL\n");
        text.push_str("t1,t1,160,2,1108,A,B,5.51,100,0,817593,130,165200,851012,ARL\n");
        text.push('\n');
        text.push_str("t2,t2,160,2,1108,A,A,21.33,10,0,817599,130,165200,851013,ARL\r\n");
        text
    }

    #[test]
    fn test_iterates_records_and_skips_blank_lines() {
        let iter = EventIterator::new(Cursor::new(sample_input()));
        let events: Vec<MboEvent> = iter.collect::<Result<_>>().unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].action, Action::Clear);
        assert_eq!(events[1].side, Side::Bid);
        assert_eq!(events[2].price, 21_330_000_000);
    }

    #[test]
    fn test_stats() {
        let input = sample_input();
        let len = input.len() as u64;
        let mut iter = EventIterator::new(Cursor::new(input));
        for event in iter.by_ref() {
            event.unwrap();
        }
        let stats = iter.stats();
        assert_eq!(stats.events_read, 3);
        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.blank_lines, 1);
        assert_eq!(stats.bytes_read, len);
    }

    #[test]
    fn test_header_only_and_empty_input() {
        assert_eq!(EventIterator::new(Cursor::new(HEADER)).count(), 0);
        assert_eq!(EventIterator::new(Cursor::new("")).count(), 0);
    }

    #[test]
    fn test_stops_after_first_error() {
        let mut text = String::from(HEADER);
        text.push_str("t1,t1,160,2,1108,A,B,5.51,100,0,1,0,0,1,ARL\n");
        text.push_str("t2,t2,160,2,1108,Z,B,5.51,100,0,2,0,0,2,ARL\n");
        text.push_str("t3,t3,160,2,1108,A,B,5.52,100,0,3,0,0,3,ARL\n");

        let results: Vec<Result<MboEvent>> = EventIterator::new(Cursor::new(text)).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().unwrap_err(),
            &MbpError::MalformedRecord {
                line: 3,
                reason: "Invalid action: 'Z'".to_string()
            }
        );
    }

    #[test]
    fn test_loader_missing_file() {
        let dir = unique_temp_dir("missing");
        let err = MboCsvLoader::new(dir.join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_loader_reads_file() {
        let dir = unique_temp_dir("reads_file");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ARL_2025-07-17.mbo.csv");
        let input = sample_input();
        std::fs::write(&path, &input).unwrap();

        let loader = MboCsvLoader::new(&path).unwrap();
        assert_eq!(loader.stats().file_size, input.len() as u64);
        assert_eq!(loader.path(), path.as_path());

        let mut iter = loader.clone().iter_events().unwrap();
        for event in iter.by_ref() {
            event.unwrap();
        }
        assert!((iter.progress() - 100.0).abs() < 1e-9);

        let events = loader.read_all().unwrap();
        assert_eq!(events.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
