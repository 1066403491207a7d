//! Core data types for MBO events and MBP snapshots.
//!
//! These types are designed to be:
//! - Compatible with Databento's MBO / MBP-10 record layouts
//! - Exact: prices are fixed-point integers, never floats
//! - Independent: a snapshot owns all of its data once built

use serde::{Deserialize, Serialize};

/// Number of price levels reported per side in every snapshot.
pub const MBP_DEPTH: usize = 10;

/// Fixed-point scale of all prices (9 implied decimals).
pub const PRICE_SCALE: i64 = 1_000_000_000;

/// Record type stamped on every emitted snapshot (MBP-10).
pub const MBP10_RTYPE: u8 = 10;

/// Render a fixed-point price with `decimals` fractional digits, rounding
/// half away from zero. `decimals` above 9 is clamped.
pub fn format_price(price: i64, decimals: usize) -> String {
    let decimals = decimals.min(9);
    let unit = 10i128.pow(9 - decimals as u32);
    let raw = price as i128;
    let rounded = if raw >= 0 {
        (raw + unit / 2) / unit
    } else {
        (raw - unit / 2) / unit
    };
    let sign = if rounded < 0 { "-" } else { "" };
    let rounded = rounded.abs();
    if decimals == 0 {
        return format!("{sign}{rounded}");
    }
    let divisor = 10i128.pow(decimals as u32);
    format!(
        "{sign}{}.{:0width$}",
        rounded / divisor,
        rounded % divisor,
        width = decimals
    )
}

/// MBO action type (what happened to the order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    /// Add new order to book
    Add = b'A',
    /// Modify existing order (not applied to the aggregated book)
    Modify = b'M',
    /// Cancel/remove order
    Cancel = b'C',
    /// Clear the whole book
    Clear = b'R',
    /// Trade execution (aggressor view)
    Trade = b'T',
    /// Fill of a resting order
    Fill = b'F',
    /// No action (status-only records)
    None = b'N',
}

impl Action {
    /// Parse action from a byte (Databento format).
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(Action::Add),
            b'M' => Some(Action::Modify),
            b'C' => Some(Action::Cancel),
            b'R' => Some(Action::Clear),
            b'T' => Some(Action::Trade),
            b'F' => Some(Action::Fill),
            b'N' => Some(Action::None),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Character code as written in CSV files.
    pub fn as_char(self) -> char {
        self.to_byte() as char
    }
}

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    Bid = b'B',
    /// Sell order (ask)
    Ask = b'A',
    /// Non-directional (used for some trade types)
    None = b'N',
}

impl Side {
    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Bid),
            b'A' => Some(Side::Ask),
            b'N' => Some(Side::None),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Character code as written in CSV files.
    pub fn as_char(self) -> char {
        self.to_byte() as char
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// The other side of the book. `None` stays `None`.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
            Side::None => Side::None,
        }
    }
}

/// Market By Order (MBO) event.
///
/// One order-level record from the feed. Only `action`, `side`, `price`,
/// `size` and `order_id` drive the book; every other field is passed
/// through to the snapshots this event triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MboEvent {
    /// Capture-server receive timestamp (opaque text)
    pub ts_recv: String,

    /// Matching-engine event timestamp (opaque text)
    pub ts_event: String,

    /// Input record type
    pub rtype: u8,

    /// Publisher (venue/dataset) identifier
    pub publisher_id: u16,

    /// Numeric instrument identifier
    pub instrument_id: u32,

    /// Order action
    pub action: Action,

    /// Order side
    pub side: Side,

    /// Price in fixed-point format (divide by 1e9 for dollars), 0 = unset
    pub price: i64,

    /// Order size in shares/contracts
    pub size: u32,

    /// Feed channel
    pub channel_id: u8,

    /// Order identifier, 0 = untracked
    pub order_id: u64,

    /// Feed flags bitfield
    pub flags: u8,

    /// Send-to-receive latency in nanoseconds
    pub ts_in_delta: i64,

    /// Venue sequence number
    pub sequence: u64,

    /// Instrument symbol
    pub symbol: String,
}

impl MboEvent {
    /// Create a new MBO event with empty passthrough fields.
    pub fn new(order_id: u64, action: Action, side: Side, price: i64, size: u32) -> Self {
        Self {
            ts_recv: String::new(),
            ts_event: String::new(),
            rtype: 160,
            publisher_id: 0,
            instrument_id: 0,
            action,
            side,
            price,
            size,
            channel_id: 0,
            order_id,
            flags: 0,
            ts_in_delta: 0,
            sequence: 0,
            symbol: String::new(),
        }
    }

    /// Set both timestamps.
    pub fn with_timestamps(mut self, ts_recv: impl Into<String>, ts_event: impl Into<String>) -> Self {
        self.ts_recv = ts_recv.into();
        self.ts_event = ts_event.into();
        self
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Set the venue sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Get price as floating point dollars.
    #[inline]
    pub fn price_as_f64(&self) -> f64 {
        self.price as f64 / PRICE_SCALE as f64
    }
}

/// One aggregated level inside a snapshot. All zero when the slot is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Level price (fixed-point)
    pub price: i64,
    /// Aggregate resting size
    pub size: u32,
    /// Number of resting orders
    pub count: u32,
}

impl LevelSnapshot {
    /// Build a level triple.
    pub fn new(price: i64, size: u32, count: u32) -> Self {
        Self { price, size, count }
    }

    /// True for a zero-filled slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.size == 0
    }
}

/// Book consistency status of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookConsistency {
    /// Book is valid: best_bid < best_ask
    Valid,
    /// Book is empty (no quotes on one or both sides)
    Empty,
    /// Book is locked: best_bid == best_ask
    Locked,
    /// Book is crossed: best_bid > best_ask
    Crossed,
}

impl BookConsistency {
    /// Returns true if the book is crossed.
    #[inline]
    pub fn is_crossed(&self) -> bool {
        matches!(self, BookConsistency::Crossed)
    }

    /// Returns true if the book is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(self, BookConsistency::Locked)
    }
}

/// Market By Price (MBP-10) snapshot.
///
/// Event metadata echoed from the triggering MBO event plus the ten best
/// levels of each side, best first. Slots beyond the book's depth are
/// zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbpSnapshot {
    pub ts_recv: String,
    pub ts_event: String,
    /// Always [`MBP10_RTYPE`]
    pub rtype: u8,
    pub publisher_id: u16,
    pub instrument_id: u32,
    pub action: Action,
    pub side: Side,
    /// Always 0
    pub depth: u8,
    pub price: i64,
    pub size: u32,
    pub flags: u8,
    pub ts_in_delta: i64,
    pub sequence: u64,

    /// Bid levels (highest price first)
    pub bids: [LevelSnapshot; MBP_DEPTH],

    /// Ask levels (lowest price first)
    pub asks: [LevelSnapshot; MBP_DEPTH],

    pub symbol: String,
    pub order_id: u64,
}

impl MbpSnapshot {
    /// Create a snapshot with empty levels and metadata copied from `event`.
    pub fn from_event(event: &MboEvent) -> Self {
        Self {
            ts_recv: event.ts_recv.clone(),
            ts_event: event.ts_event.clone(),
            rtype: MBP10_RTYPE,
            publisher_id: event.publisher_id,
            instrument_id: event.instrument_id,
            action: event.action,
            side: event.side,
            depth: 0,
            price: event.price,
            size: event.size,
            flags: event.flags,
            ts_in_delta: event.ts_in_delta,
            sequence: event.sequence,
            bids: [LevelSnapshot::default(); MBP_DEPTH],
            asks: [LevelSnapshot::default(); MBP_DEPTH],
            symbol: event.symbol.clone(),
            order_id: event.order_id,
        }
    }

    /// Best (highest) bid price, if the bid side is non-empty.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        let top = self.bids[0];
        (!top.is_empty()).then_some(top.price)
    }

    /// Best (lowest) ask price, if the ask side is non-empty.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        let top = self.asks[0];
        (!top.is_empty()).then_some(top.price)
    }

    /// Number of populated bid slots.
    pub fn active_bid_levels(&self) -> usize {
        self.bids.iter().filter(|l| !l.is_empty()).count()
    }

    /// Number of populated ask slots.
    pub fn active_ask_levels(&self) -> usize {
        self.asks.iter().filter(|l| !l.is_empty()).count()
    }

    /// Classify the top of book.
    #[inline]
    pub fn check_consistency(&self) -> BookConsistency {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => {
                if bid < ask {
                    BookConsistency::Valid
                } else if bid == ask {
                    BookConsistency::Locked
                } else {
                    BookConsistency::Crossed
                }
            }
            _ => BookConsistency::Empty,
        }
    }
}
