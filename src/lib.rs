//! # MBO-MBP-Reconstructor
//!
//! Rebuilds market-by-price (MBP-10) snapshots from a market-by-order (MBO)
//! event stream.
//!
//! Each order-level event (add, cancel, trade, fill, clear) updates an
//! aggregated book of price levels; every event that changes the book
//! produces one snapshot of the ten best levels per side. The
//! Trade → Fill → Cancel pattern the feed uses for one execution is
//! collapsed into a single book mutation and a single snapshot.
//!
//! ## Features
//!
//! - **Exact prices**: fixed-point `i64` with 9 decimals, no float keys
//! - **Trade stitching**: one mutation per execution, on the resting side
//! - **Streaming I/O**: CSV in, CSV out, 1 MB buffers, no full-file loads
//! - **Diagnostics**: counters, categorised warnings, crossed-book checks
//!
//! ## Quick Start
//!
//! ```rust
//! use mbo_mbp_reconstructor::{Action, MboEvent, MbpReconstructor, Side};
//!
//! let mut reconstructor = MbpReconstructor::new();
//!
//! let events = vec![
//!     MboEvent::new(1, Action::Add, Side::Ask, 10_750_000_000, 150),
//!     MboEvent::new(77, Action::Trade, Side::Bid, 10_750_000_000, 50),
//!     MboEvent::new(77, Action::Fill, Side::Bid, 10_750_000_000, 50),
//!     MboEvent::new(900, Action::Cancel, Side::Bid, 10_750_000_000, 50),
//! ];
//!
//! let snapshots = reconstructor.process_events(&events);
//!
//! // One snapshot for the add, one for the whole trade sequence
//! assert_eq!(snapshots.len(), 2);
//! assert_eq!(snapshots[1].action, Action::Trade);
//! assert_eq!(snapshots[1].asks[0].size, 100);
//! ```
//!
//! ### File to file
//!
//! ```no_run
//! use mbo_mbp_reconstructor::{CsvSink, CsvSource, MbpReconstructor};
//!
//! let source = CsvSource::new("mbo.csv")?;
//! let mut sink = CsvSink::create("output_mbp.csv")?;
//! let summary = MbpReconstructor::new().run(source, &mut sink)?;
//! println!("{} snapshots", summary.snapshots_written);
//! # Ok::<(), mbo_mbp_reconstructor::MbpError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `MboEvent`, `MbpSnapshot`, `Action`, `Side` |
//! | [`book`] | `OrderBook`, `TradeSequenceStitcher`, `MbpReconstructor` |
//! | [`csv_codec`] | MBO record parsing and MBP row formatting |
//! | [`loader`] | Buffered streaming reader for MBO files |
//! | [`source`] | `EventSource` trait with CSV and in-memory sources |
//! | [`sink`] | `SnapshotSink` trait with CSV and in-memory sinks |
//! | [`warnings`] | Diagnostic tracking: `WarningTracker`, `WarningCategory` |

pub mod book;
pub mod csv_codec;
pub mod error;
pub mod loader;
pub mod sink;
pub mod source;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{MbpError, Result};
pub use types::{
    format_price, Action, BookConsistency, LevelSnapshot, MboEvent, MbpSnapshot, Side,
    MBP10_RTYPE, MBP_DEPTH, PRICE_SCALE,
};

// Re-exports - Book and dispatch
pub use book::{
    CancelMatchPolicy, MbpReconstructor, OrderBook, OrderBookSide, PendingTrade, PriceLevel,
    ReconstructorConfig, ReconstructorStats, RunSummary, TradeSequenceStitcher,
};

// Re-exports - I/O
pub use csv_codec::CsvFormat;
pub use loader::{EventIterator, LoaderStats, MboCsvLoader, IO_BUFFER_SIZE};
pub use sink::{CsvSink, NullSink, SnapshotSink};
pub use source::{CsvSource, EventSource, SourceMetadata, VecSource};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};
