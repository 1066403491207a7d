//! One side of the aggregated order book.
//!
//! - **Bids**: best = highest price, reported high → low
//! - **Asks**: best = lowest price, reported low → high
//!
//! `BTreeMap` keeps prices sorted ascending; the bid side simply walks it
//! backwards. Levels are removed as soon as they drain.

use std::collections::BTreeMap;

use super::price_level::PriceLevel;
use crate::types::{LevelSnapshot, Side};

/// All price levels for one side of the book.
#[derive(Debug, Clone)]
pub struct OrderBookSide {
    /// Which side this represents (determines "best" direction)
    side: Side,
    /// Price levels keyed by price
    levels: BTreeMap<i64, PriceLevel>,
}

impl OrderBookSide {
    /// Create an empty side. `side` must be `Bid` or `Ask`.
    pub fn new(side: Side) -> Self {
        debug_assert!(side != Side::None, "book side must be Bid or Ask");
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Which side this collection represents.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Add one order at `price`, creating the level if needed.
    pub fn add_order(&mut self, price: i64, size: u32) {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .add_order(size);
    }

    /// Remove one order at `price`.
    ///
    /// Returns `false` if no level exists at `price` (nothing changed).
    pub fn cancel_order(&mut self, price: i64, size: u32) -> bool {
        match self.levels.get_mut(&price) {
            Some(level) => {
                if !level.cancel_order(size) {
                    self.levels.remove(&price);
                }
                true
            }
            None => false,
        }
    }

    /// Remove traded liquidity at `price`, leaving the order count alone.
    ///
    /// Returns `false` if no level exists at `price` (nothing changed).
    pub fn reduce(&mut self, price: i64, size: u32) -> bool {
        match self.levels.get_mut(&price) {
            Some(level) => {
                if !level.reduce(size) {
                    self.levels.remove(&price);
                }
                true
            }
            None => false,
        }
    }

    /// Drop every level.
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Level at an exact price.
    #[inline]
    pub fn level(&self, price: i64) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// Number of distinct price levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True when the side holds no levels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Best price (highest bid / lowest ask).
    pub fn best_price(&self) -> Option<i64> {
        if self.side.is_bid() {
            self.levels.keys().next_back().copied()
        } else {
            self.levels.keys().next().copied()
        }
    }

    /// Levels in priority order, best first.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        if self.side.is_bid() {
            Box::new(self.levels.values().rev())
        } else {
            Box::new(self.levels.values())
        }
    }

    /// Write the best `out.len()` levels into `out`, zero-filling the rest.
    pub fn fill_depth(&self, out: &mut [LevelSnapshot]) {
        if self.side.is_bid() {
            fill_slots(self.levels.values().rev(), out);
        } else {
            fill_slots(self.levels.values(), out);
        }
    }
}

#[inline]
fn fill_slots<'a>(mut levels: impl Iterator<Item = &'a PriceLevel>, out: &mut [LevelSnapshot]) {
    for slot in out.iter_mut() {
        *slot = levels
            .next()
            .map(PriceLevel::to_snapshot)
            .unwrap_or_default();
    }
}
