//! Aggregated two-sided order book.
//!
//! The book only knows price levels. It never fails: mutations against a
//! price that has no level are silent no-ops, so a feed that diverges from
//! the book (missed adds, duplicate cancels) degrades gracefully instead of
//! aborting the run. Every mutation returns whether a level was touched so
//! the caller can keep diagnostics.

use std::fmt;

use super::book_side::OrderBookSide;
use crate::types::{format_price, MboEvent, MbpSnapshot, Side};

/// Two-sided aggregated order book.
#[derive(Debug, Clone)]
pub struct OrderBook {
    bids: OrderBookSide,
    asks: OrderBookSide,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self {
            bids: OrderBookSide::new(Side::Bid),
            asks: OrderBookSide::new(Side::Ask),
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> Option<&mut OrderBookSide> {
        match side {
            Side::Bid => Some(&mut self.bids),
            Side::Ask => Some(&mut self.asks),
            Side::None => None,
        }
    }

    /// Add one order of `size` at `price`.
    ///
    /// Returns `false` (book unchanged) for `Side::None` or a zero size.
    pub fn add_order(&mut self, side: Side, price: i64, size: u32) -> bool {
        if size == 0 {
            return false;
        }
        match self.side_mut(side) {
            Some(book_side) => {
                book_side.add_order(price, size);
                true
            }
            None => false,
        }
    }

    /// Remove one order of `size` at `price`.
    ///
    /// The level is removed when its size or count reaches zero. Returns
    /// `false` (book unchanged) if there is no level at `price`.
    pub fn cancel_order(&mut self, side: Side, price: i64, size: u32) -> bool {
        self.side_mut(side)
            .map_or(false, |book_side| book_side.cancel_order(price, size))
    }

    /// Remove executed liquidity from the resting side.
    ///
    /// Only the aggregate size changes; the order count is kept because a
    /// partial execution leaves the other orders at the level in place.
    /// Returns `false` (book unchanged) if there is no level at `price`.
    pub fn apply_trade(&mut self, resting_side: Side, price: i64, size: u32) -> bool {
        self.side_mut(resting_side)
            .map_or(false, |book_side| book_side.reduce(price, size))
    }

    /// Empty both sides.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Build an MBP-10 snapshot whose metadata comes from `event`.
    pub fn snapshot(&self, event: &MboEvent) -> MbpSnapshot {
        let mut snapshot = MbpSnapshot::from_event(event);
        self.bids.fill_depth(&mut snapshot.bids);
        self.asks.fill_depth(&mut snapshot.asks);
        snapshot
    }

    /// Bid side.
    #[inline]
    pub fn bids(&self) -> &OrderBookSide {
        &self.bids
    }

    /// Ask side.
    #[inline]
    pub fn asks(&self) -> &OrderBookSide {
        &self.asks
    }

    /// Highest bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.best_price()
    }

    /// Lowest ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.best_price()
    }

    /// Number of price levels on bid side.
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of price levels on ask side.
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// True when both sides are empty.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl fmt::Display for OrderBook {
    /// Asks from worst to best, then bids from best to worst.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== ORDER BOOK ===")?;
        writeln!(f, "ASKS:")?;
        let asks: Vec<_> = self.asks.iter().collect();
        for level in asks.iter().rev() {
            writeln!(
                f,
                "  {} x {} ({} orders)",
                format_price(level.price(), 2),
                level.total_size(),
                level.order_count()
            )?;
        }
        writeln!(f, "BIDS:")?;
        for level in self.bids.iter() {
            writeln!(
                f,
                "  {} x {} ({} orders)",
                format_price(level.price(), 2),
                level.total_size(),
                level.order_count()
            )?;
        }
        write!(f, "==================")
    }
}
