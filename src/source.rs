//! Event source abstraction.
//!
//! The dispatch loop pulls events from anything implementing
//! [`EventSource`]: a CSV file on disk, an in-memory vector in tests, or a
//! caller-provided adapter.
//!
//! # Implementing Custom Sources
//!
//! ```
//! use mbo_mbp_reconstructor::source::{EventSource, SourceMetadata};
//! use mbo_mbp_reconstructor::{MboEvent, Result};
//!
//! struct Replay {
//!     events: Vec<MboEvent>,
//!     metadata: SourceMetadata,
//! }
//!
//! impl EventSource for Replay {
//!     type EventIter = std::iter::Map<std::vec::IntoIter<MboEvent>, fn(MboEvent) -> Result<MboEvent>>;
//!
//!     fn events(self) -> Result<Self::EventIter> {
//!         Ok(self.events.into_iter().map(Ok as fn(MboEvent) -> Result<MboEvent>))
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::loader::{EventIterator, MboCsvLoader};
use crate::types::MboEvent;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about an event source, for logging and output naming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Trading symbol (e.g., "ARL")
    pub symbol: Option<String>,

    /// Trading date in YYYY-MM-DD format
    pub date: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Source kind (e.g., "csv", "memory")
    pub provider: Option<String>,

    /// Known event count (in-memory sources only)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Extract metadata from a file path.
    ///
    /// Parses symbol and date from common file names:
    /// - `ARL_2025-07-17.mbo.csv` → symbol="ARL", date="2025-07-17"
    /// - `ARL.csv` → symbol="ARL"
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }

        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            let base = filename
                .trim_end_matches(".csv")
                .trim_end_matches(".mbo")
                .trim_end_matches(".mbp-10");

            match base.split_once('_') {
                Some((symbol, rest)) => {
                    if !symbol.is_empty() {
                        metadata.symbol = Some(symbol.to_string());
                    }
                    if looks_like_date(rest) {
                        metadata.date = Some(rest[..10].to_string());
                    }
                }
                None if !base.is_empty() => metadata.symbol = Some(base.to_string()),
                None => {}
            }
        }

        metadata
    }
}

fn looks_like_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[..10]
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

// ============================================================================
// Event Source Trait
// ============================================================================

/// A single-pass, ordered stream of MBO events.
///
/// - `events()` consumes `self`
/// - Items are `Result`s: a decode failure is yielded once and ends the
///   stream
/// - Metadata should be populated before calling `events()`
pub trait EventSource {
    /// The iterator type for events.
    type EventIter: Iterator<Item = Result<MboEvent>>;

    /// Consume the source and return an iterator over events.
    ///
    /// # Returns
    ///
    /// * `Ok(Iterator)` - Iterator over decoded events
    /// * `Err(...)` - Failed to open the source
    fn events(self) -> Result<Self::EventIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// In-memory source, mostly for tests and benchmarks.
///
/// # Example
///
/// ```
/// use mbo_mbp_reconstructor::source::{EventSource, VecSource};
/// use mbo_mbp_reconstructor::{Action, MboEvent, Side};
///
/// let events = vec![
///     MboEvent::new(1, Action::Add, Side::Bid, 100_000_000_000, 100),
///     MboEvent::new(2, Action::Add, Side::Ask, 100_010_000_000, 100),
/// ];
///
/// let source = VecSource::new(events);
/// assert_eq!(source.metadata().estimated_events, Some(2));
/// assert_eq!(source.events().unwrap().count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct VecSource {
    events: Vec<MboEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    /// Create a new vector source.
    pub fn new(events: Vec<MboEvent>) -> Self {
        let mut metadata = SourceMetadata::new().with_provider("memory");
        metadata.estimated_events = Some(events.len() as u64);
        Self { events, metadata }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Iterator returned by [`VecSource`].
pub type VecEventIter = std::iter::Map<std::vec::IntoIter<MboEvent>, fn(MboEvent) -> Result<MboEvent>>;

impl EventSource for VecSource {
    type EventIter = VecEventIter;

    fn events(self) -> Result<Self::EventIter> {
        let wrap: fn(MboEvent) -> Result<MboEvent> = Ok;
        Ok(self.events.into_iter().map(wrap))
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// CSV Source
// ============================================================================

/// Event source backed by an MBO CSV file.
///
/// ```no_run
/// use mbo_mbp_reconstructor::source::{CsvSource, EventSource};
///
/// let source = CsvSource::new("data/ARL_2025-07-17.mbo.csv")?;
/// println!("Symbol: {:?}", source.metadata().symbol);
/// for event in source.events()? {
///     let _event = event?;
/// }
/// # Ok::<(), mbo_mbp_reconstructor::MbpError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    loader: MboCsvLoader,
    metadata: SourceMetadata,
}

impl CsvSource {
    /// Open a CSV source.
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSource)` - Ready to iterate
    /// * `Err(...)` - File not found
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let loader = MboCsvLoader::new(path)?;
        let metadata = SourceMetadata::from_path(path).with_provider("csv");
        Ok(Self { loader, metadata })
    }

    /// Get the file path being used.
    pub fn path(&self) -> &Path {
        self.loader.path()
    }
}

impl EventSource for CsvSource {
    type EventIter = EventIterator<BufReader<File>>;

    fn events(self) -> Result<Self::EventIter> {
        self.loader.iter_events()
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}
