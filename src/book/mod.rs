//! Aggregated order book and MBO event interpretation.
//!
//! Bottom-up: [`PriceLevel`] → [`OrderBookSide`] → [`OrderBook`], the
//! [`TradeSequenceStitcher`] for Trade/Fill/Cancel triplets, and the
//! [`MbpReconstructor`] dispatch loop on top.

mod book_side;
mod order_book;
mod price_level;
pub mod reconstructor;
pub mod stitcher;

pub use book_side::OrderBookSide;
pub use order_book::OrderBook;
pub use price_level::PriceLevel;
pub use reconstructor::{MbpReconstructor, ReconstructorConfig, ReconstructorStats, RunSummary};
pub use stitcher::{
    CancelMatchPolicy, FlushOutcome, PendingTrade, ResolvedTrade, TradeSequenceStitcher,
};
