//! Trade → Fill → Cancel stitching.
//!
//! A single execution against a resting order reaches the feed as up to
//! three records:
//!
//! 1. **Trade** (`T`): the aggressor's view (side = aggressor side)
//! 2. **Fill** (`F`): the resting order was (partially) filled
//! 3. **Cancel** (`C`): the filled quantity leaves the book
//!
//! Applying each record on its own would remove the liquidity twice or on
//! the wrong side. The stitcher holds the Trade until the matching Cancel
//! arrives and then performs exactly one `apply_trade` on the resting side
//! (the opposite of the Trade's side) and builds exactly one snapshot.
//!
//! # Lifecycle per order id
//!
//! ```text
//! Unseen --Trade(side != None)--> AwaitingFill --Fill--> AwaitingCancel --Cancel--> Resolved
//! ```
//!
//! A Cancel that matches a pending trade resolves it whether or not the
//! Fill was seen. At end of stream, trades that saw a Fill but never a
//! Cancel are applied anyway; trades that never saw a Fill are dropped.
//!
//! # Matching
//!
//! The Cancel usually carries a different order id than the Trade, so
//! pending trades are matched on `(price, side)`. The pending table is
//! scanned in ascending order id and the first match wins.

use std::collections::BTreeMap;

use super::order_book::OrderBook;
use crate::types::{Action, MboEvent, MbpSnapshot, Side};

/// How a Cancel's side is compared with a pending Trade's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelMatchPolicy {
    /// Cancel side must equal the Trade's (aggressor) side (default)
    #[default]
    SameSide,

    /// Cancel side must equal the resting side, i.e. the opposite of the
    /// Trade's side
    RestingSide,
}

impl CancelMatchPolicy {
    #[inline]
    fn matches(self, trade_side: Side, cancel_side: Side) -> bool {
        match self {
            CancelMatchPolicy::SameSide => trade_side == cancel_side,
            CancelMatchPolicy::RestingSide => trade_side.opposite() == cancel_side,
        }
    }
}

/// A trade waiting for its Fill and/or Cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrade {
    /// The originating Trade event
    pub trade: MboEvent,
    /// Whether a Fill for this order id has been seen
    pub has_fill: bool,
}

impl PendingTrade {
    /// Side whose liquidity the trade consumed.
    #[inline]
    pub fn resting_side(&self) -> Side {
        self.trade.side.opposite()
    }
}

/// Outcome of a flush, for callers that keep diagnostics.
#[derive(Debug, Clone, Default)]
pub struct FlushOutcome {
    /// Filled but uncancelled trades, applied in ascending order id
    pub resolved: Vec<ResolvedTrade>,
    /// Pending trades dropped because no Fill was ever seen
    pub abandoned: Vec<PendingTrade>,
}

/// Table of in-flight trades keyed by the Trade's order id.
#[derive(Debug, Clone, Default)]
pub struct TradeSequenceStitcher {
    policy: CancelMatchPolicy,
    pending: BTreeMap<u64, PendingTrade>,
}

impl TradeSequenceStitcher {
    /// Create a stitcher with the default (`SameSide`) matching policy.
    pub fn new() -> Self {
        Self::with_policy(CancelMatchPolicy::default())
    }

    /// Create a stitcher with an explicit matching policy.
    pub fn with_policy(policy: CancelMatchPolicy) -> Self {
        Self {
            policy,
            pending: BTreeMap::new(),
        }
    }

    /// Matching policy in use.
    #[inline]
    pub fn policy(&self) -> CancelMatchPolicy {
        self.policy
    }

    /// Start tracking a Trade event.
    ///
    /// Returns `false` and records nothing for a Trade without a side.
    /// A repeated Trade for an order id that is still pending replaces the
    /// earlier entry (and forgets its Fill).
    pub fn begin_trade(&mut self, trade: &MboEvent) -> bool {
        if trade.side == Side::None {
            return false;
        }
        self.pending.insert(
            trade.order_id,
            PendingTrade {
                trade: trade.clone(),
                has_fill: false,
            },
        );
        true
    }

    /// Mark the pending trade for `fill.order_id` as filled.
    ///
    /// Returns `false` for a Fill with no pending trade.
    pub fn mark_fill(&mut self, fill: &MboEvent) -> bool {
        match self.pending.get_mut(&fill.order_id) {
            Some(pending) => {
                pending.has_fill = true;
                true
            }
            None => false,
        }
    }

    /// Try to resolve a pending trade with `cancel`.
    ///
    /// On a match the trade's size is removed from the resting side of
    /// `book`, the entry is deleted and a trade snapshot is returned.
    /// Returns `None` when no pending trade matches; the caller then treats
    /// the Cancel as an ordinary cancellation.
    pub fn resolve_cancel(
        &mut self,
        cancel: &MboEvent,
        book: &mut OrderBook,
    ) -> Option<ResolvedTrade> {
        let policy = self.policy;
        let order_id = self
            .pending
            .iter()
            .find(|(_, pending)| {
                pending.trade.price == cancel.price
                    && policy.matches(pending.trade.side, cancel.side)
            })
            .map(|(&order_id, _)| order_id)?;
        let pending = self.pending.remove(&order_id)?;
        Some(Self::apply(pending, book))
    }

    /// Drain the table at end of stream.
    ///
    /// Filled trades are applied in ascending order id with an implicit
    /// Cancel; the rest are returned as abandoned.
    pub fn flush(&mut self, book: &mut OrderBook) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();
        for (_, pending) in std::mem::take(&mut self.pending) {
            if pending.has_fill {
                outcome.resolved.push(Self::apply(pending, book));
            } else {
                outcome.abandoned.push(pending);
            }
        }
        outcome
    }

    fn apply(pending: PendingTrade, book: &mut OrderBook) -> ResolvedTrade {
        let resting_side = pending.resting_side();
        let mut trade = pending.trade;
        let level_found = book.apply_trade(resting_side, trade.price, trade.size);

        trade.action = Action::Trade;
        trade.side = resting_side;
        ResolvedTrade {
            snapshot: book.snapshot(&trade),
            order_id: trade.order_id,
            level_found,
        }
    }

    /// Pending entry for an order id.
    pub fn get(&self, order_id: u64) -> Option<&PendingTrade> {
        self.pending.get(&order_id)
    }

    /// Pending entries in ascending order id.
    pub fn iter(&self) -> impl Iterator<Item = &PendingTrade> {
        self.pending.values()
    }

    /// Number of in-flight trades.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget every pending trade.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// A trade applied to the book.
#[derive(Debug, Clone)]
pub struct ResolvedTrade {
    /// Snapshot after the trade, tagged `Trade` on the resting side
    pub snapshot: MbpSnapshot,
    /// Order id of the originating Trade event
    pub order_id: u64,
    /// Whether a level existed at the trade price on the resting side
    pub level_found: bool,
}
