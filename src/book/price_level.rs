//! Aggregated price level.
//!
//! A `PriceLevel` only keeps the aggregate resting size and the number of
//! orders at one price. Individual orders are not tracked, so a cancel
//! always removes exactly one order from the count regardless of its size.
//!
//! # Invariant
//!
//! A level that is still stored in a book side has `total_size > 0` and
//! `order_count > 0`. Mutations that would break this leave the level
//! drained (both zero) and report it, so the owning side can remove it.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `add_order` | O(1) |
//! | `cancel_order` | O(1) |
//! | `reduce` | O(1) |

use crate::types::LevelSnapshot;

/// A price level in the order book with aggregate size and order count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price of this level (fixed-point)
    price: i64,
    /// Sum of resting sizes
    total_size: u32,
    /// Number of resting orders
    order_count: u32,
}

impl PriceLevel {
    /// Create a new empty price level.
    #[inline]
    pub fn new(price: i64) -> Self {
        Self {
            price,
            total_size: 0,
            order_count: 0,
        }
    }

    /// Add one order of `size` to this level.
    #[inline]
    pub fn add_order(&mut self, size: u32) {
        self.total_size = self.total_size.saturating_add(size);
        self.order_count = self.order_count.saturating_add(1);
    }

    /// Remove one order of `size` from this level.
    ///
    /// Returns `true` if the level is still live afterwards.
    #[inline]
    pub fn cancel_order(&mut self, size: u32) -> bool {
        if size >= self.total_size || self.order_count <= 1 {
            self.drain();
            return false;
        }
        self.total_size -= size;
        self.order_count -= 1;
        true
    }

    /// Remove `size` of liquidity without touching the order count
    /// (partial execution of a resting order).
    ///
    /// Returns `true` if the level is still live afterwards.
    #[inline]
    pub fn reduce(&mut self, size: u32) -> bool {
        if size >= self.total_size {
            self.drain();
            return false;
        }
        self.total_size -= size;
        true
    }

    #[inline]
    fn drain(&mut self) {
        self.total_size = 0;
        self.order_count = 0;
    }

    /// Price of this level.
    #[inline]
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Aggregate resting size.
    #[inline]
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Number of resting orders.
    #[inline]
    pub fn order_count(&self) -> u32 {
        self.order_count
    }

    /// True when the level no longer satisfies the storage invariant.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_size == 0 || self.order_count == 0
    }

    /// Copy out the `(price, size, count)` triple.
    #[inline]
    pub fn to_snapshot(&self) -> LevelSnapshot {
        LevelSnapshot::new(self.price, self.total_size, self.order_count)
    }
}
