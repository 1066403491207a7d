//! Event dispatch loop.
//!
//! [`MbpReconstructor`] owns the [`OrderBook`], the
//! [`TradeSequenceStitcher`] and the run diagnostics. It routes each MBO
//! event to one of them and emits at most one snapshot per event:
//!
//! | Action | Effect | Snapshot |
//! |--------|--------|----------|
//! | Add | add to book | yes |
//! | Cancel | resolve a pending trade, else cancel from book | yes |
//! | Trade | start a pending trade (ignored without side) | no |
//! | Fill | mark the pending trade filled | no |
//! | Clear | empty the book | yes, unless it is the first event |
//! | Modify / None | ignored | no |
//!
//! [`finish`](MbpReconstructor::finish) drains the pending trades once the
//! stream ends.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::order_book::OrderBook;
use super::stitcher::{CancelMatchPolicy, TradeSequenceStitcher};
use crate::error::Result;
use crate::sink::SnapshotSink;
use crate::source::{EventSource, SourceMetadata};
use crate::types::{format_price, Action, BookConsistency, MboEvent, MbpSnapshot};
use crate::warnings::{WarningCategory, WarningTracker, WarningTrackerConfig};

/// Configuration for the dispatch loop.
#[derive(Debug, Clone)]
pub struct ReconstructorConfig {
    /// Drop a Clear that is the very first event of the stream
    pub skip_initial_clear: bool,

    /// How a Cancel is matched against pending trades
    pub cancel_match: CancelMatchPolicy,

    /// Whether to log diagnostics through the `log` facade
    pub log_warnings: bool,

    /// Log progress every N events (0 disables)
    pub progress_interval: u64,

    /// Diagnostic tracker settings
    pub warnings: WarningTrackerConfig,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            skip_initial_clear: true,
            cancel_match: CancelMatchPolicy::SameSide,
            log_warnings: true,
            progress_interval: 10_000,
            warnings: WarningTrackerConfig::default(),
        }
    }
}

impl ReconstructorConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep or drop a leading Clear.
    pub fn with_skip_initial_clear(mut self, skip: bool) -> Self {
        self.skip_initial_clear = skip;
        self
    }

    /// Set the cancel matching policy.
    pub fn with_cancel_match(mut self, policy: CancelMatchPolicy) -> Self {
        self.cancel_match = policy;
        self
    }

    /// Enable/disable diagnostic logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }

    /// Set the progress log interval (0 disables).
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the diagnostic tracker settings.
    pub fn with_warnings(mut self, warnings: WarningTrackerConfig) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Counters for one reconstruction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructorStats {
    /// Events passed to `process_event`
    pub events_processed: u64,

    /// Snapshots emitted (including end-of-stream flush)
    pub snapshots_emitted: u64,

    pub adds: u64,
    pub cancels: u64,
    pub trades: u64,
    pub fills: u64,
    pub clears: u64,

    /// Modify / None events ignored
    pub unsupported_actions: u64,

    /// Trades resolved by a matching Cancel
    pub trades_resolved: u64,

    /// Filled trades applied at end of stream
    pub trades_flushed: u64,

    /// Unfilled trades dropped at end of stream
    pub trades_abandoned: u64,

    /// Trades without a side
    pub trades_ignored: u64,

    /// Fills with no pending trade
    pub orphan_fills: u64,

    /// Cancels and trades that found no level
    pub missing_levels: u64,

    /// Adds that left the book unchanged (zero size or no side)
    pub rejected_adds: u64,

    /// Emitted snapshots with best bid > best ask
    pub crossed_snapshots: u64,

    /// Emitted snapshots with best bid == best ask
    pub locked_snapshots: u64,

    /// Whether a leading Clear was dropped
    pub initial_clear_skipped: bool,

    /// Trades currently awaiting their Cancel
    pub pending_trades: usize,

    /// Current number of bid levels
    pub bid_levels: usize,

    /// Current number of ask levels
    pub ask_levels: usize,
}

/// Result of [`MbpReconstructor::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Metadata of the source that was read
    pub source: SourceMetadata,

    /// Events read during this run
    pub events_read: u64,

    /// Snapshots handed to the sink during this run
    pub snapshots_written: u64,

    /// Wall time of the run
    pub elapsed: Duration,

    /// Counters after the run
    pub stats: ReconstructorStats,
}

/// MBO → MBP-10 reconstructor for a single instrument.
///
/// # Example
///
/// ```
/// use mbo_mbp_reconstructor::{Action, MbpReconstructor, MboEvent, Side};
///
/// let mut reconstructor = MbpReconstructor::new();
/// let snap = reconstructor
///     .process_event(&MboEvent::new(1001, Action::Add, Side::Bid, 10_500_000_000, 100))
///     .unwrap();
///
/// assert_eq!(snap.bids[0].price, 10_500_000_000);
/// assert_eq!(snap.bids[0].size, 100);
/// ```
#[derive(Debug, Clone)]
pub struct MbpReconstructor {
    config: ReconstructorConfig,
    book: OrderBook,
    stitcher: TradeSequenceStitcher,
    stats: ReconstructorStats,
    warnings: WarningTracker,
}

impl Default for MbpReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl MbpReconstructor {
    /// Create a reconstructor with default configuration.
    pub fn new() -> Self {
        Self::with_config(ReconstructorConfig::default())
    }

    /// Create a reconstructor with custom configuration.
    ///
    /// # Example
    /// ```
    /// use mbo_mbp_reconstructor::{CancelMatchPolicy, MbpReconstructor, ReconstructorConfig};
    ///
    /// let config = ReconstructorConfig::new()
    ///     .with_cancel_match(CancelMatchPolicy::RestingSide)
    ///     .with_skip_initial_clear(false);
    /// let reconstructor = MbpReconstructor::with_config(config);
    /// ```
    pub fn with_config(config: ReconstructorConfig) -> Self {
        let mut tracker_config = config.warnings.clone();
        tracker_config.log_warnings &= config.log_warnings;

        Self {
            stitcher: TradeSequenceStitcher::with_policy(config.cancel_match),
            warnings: WarningTracker::with_config(tracker_config),
            book: OrderBook::new(),
            stats: ReconstructorStats::default(),
            config,
        }
    }

    /// Get a reference to the current configuration.
    #[inline]
    pub fn config(&self) -> &ReconstructorConfig {
        &self.config
    }

    /// Current book.
    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Pending trade table.
    #[inline]
    pub fn stitcher(&self) -> &TradeSequenceStitcher {
        &self.stitcher
    }

    /// Run counters.
    #[inline]
    pub fn stats(&self) -> &ReconstructorStats {
        &self.stats
    }

    /// Recorded diagnostics.
    #[inline]
    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }

    /// Process a single MBO event.
    ///
    /// # Arguments
    /// * `event` - The next event of the stream, in feed order
    ///
    /// # Returns
    /// The snapshot this event produced, if any.
    pub fn process_event(&mut self, event: &MboEvent) -> Option<MbpSnapshot> {
        self.stats.events_processed += 1;
        let index = self.stats.events_processed;

        if self.config.progress_interval > 0 && index % self.config.progress_interval == 0 {
            log::info!("Processed {index} events");
        }

        let snapshot = match event.action {
            Action::Add => self.on_add(event),
            Action::Cancel => self.on_cancel(event),
            Action::Trade => self.on_trade(event),
            Action::Fill => self.on_fill(event),
            Action::Clear => self.on_clear(event, index),
            Action::Modify | Action::None => self.on_unsupported(event),
        };

        self.refresh_depth_stats();
        snapshot.map(|s| self.emit(s))
    }

    /// Process a whole slice and drain pending trades.
    pub fn process_events(&mut self, events: &[MboEvent]) -> Vec<MbpSnapshot> {
        let mut out: Vec<MbpSnapshot> = events
            .iter()
            .filter_map(|event| self.process_event(event))
            .collect();
        out.extend(self.finish());
        out
    }

    /// Drain the pending trade table at end of stream.
    ///
    /// Filled trades are applied in ascending order id, one snapshot each.
    /// Unfilled trades are dropped. Calling this twice is harmless.
    pub fn finish(&mut self) -> Vec<MbpSnapshot> {
        let outcome = self.stitcher.flush(&mut self.book);
        let index = self.stats.events_processed;

        for pending in &outcome.abandoned {
            self.stats.trades_abandoned += 1;
            let trade = &pending.trade;
            let warning = self
                .warnings
                .build(
                    WarningCategory::AbandonedTrade,
                    format!(
                        "trade {} at {} never filled",
                        trade.order_id,
                        format_price(trade.price, 2)
                    ),
                )
                .with_order_id(trade.order_id)
                .with_price(trade.price)
                .with_size(trade.size)
                .with_sequence(trade.sequence)
                .with_event_index(index);
            self.warnings.record(warning);
        }

        let mut snapshots = Vec::with_capacity(outcome.resolved.len());
        for resolved in outcome.resolved {
            self.stats.trades_flushed += 1;
            let snap = &resolved.snapshot;
            let warning = self
                .warnings
                .build(
                    WarningCategory::ImplicitCancel,
                    format!("trade {} applied without cancel", resolved.order_id),
                )
                .with_order_id(resolved.order_id)
                .with_price(snap.price)
                .with_size(snap.size)
                .with_sequence(snap.sequence)
                .with_event_index(index);
            self.warnings.record(warning);
            if !resolved.level_found {
                self.missing_level(snap.order_id, snap.price, snap.size, snap.sequence);
            }
            snapshots.push(self.emit(resolved.snapshot));
        }

        self.refresh_depth_stats();
        if !snapshots.is_empty() {
            log::debug!("Flushed {} filled trades at end of stream", snapshots.len());
        }
        snapshots
    }

    /// Read every event from `source`, write every snapshot to `sink`,
    /// drain pending trades and finish the sink.
    ///
    /// Stops at the first input or output error.
    pub fn run<S, K>(&mut self, source: S, sink: &mut K) -> Result<RunSummary>
    where
        S: EventSource,
        K: SnapshotSink + ?Sized,
    {
        let start = Instant::now();
        let metadata = source.metadata().clone();
        let events_before = self.stats.events_processed;
        let mut written = 0u64;

        match &metadata.file_path {
            Some(path) => log::info!("Reading MBO events from {}", path.display()),
            None => log::info!(
                "Reading MBO events from {} source",
                metadata.provider.as_deref().unwrap_or("unnamed")
            ),
        }

        for event in source.events()? {
            let event = event?;
            if let Some(snapshot) = self.process_event(&event) {
                sink.write_snapshot(&snapshot)?;
                written += 1;
            }
        }

        for snapshot in self.finish() {
            sink.write_snapshot(&snapshot)?;
            written += 1;
        }
        sink.finish()?;

        let summary = RunSummary {
            source: metadata,
            events_read: self.stats.events_processed - events_before,
            snapshots_written: written,
            elapsed: start.elapsed(),
            stats: self.stats.clone(),
        };
        log::info!(
            "Processed {} events into {} snapshots in {} ms",
            summary.events_read,
            summary.snapshots_written,
            summary.elapsed.as_millis()
        );
        Ok(summary)
    }

    /// Reset book, pending trades, counters and diagnostics.
    pub fn reset(&mut self) {
        self.book.clear();
        self.stitcher.clear();
        self.stats = ReconstructorStats::default();
        self.warnings.clear();
    }

    // ------------------------------------------------------------------------
    // Action handlers
    // ------------------------------------------------------------------------

    fn on_add(&mut self, event: &MboEvent) -> Option<MbpSnapshot> {
        self.stats.adds += 1;
        if !self.book.add_order(event.side, event.price, event.size) {
            self.stats.rejected_adds += 1;
            let warning = self.event_warning(
                WarningCategory::DataQuality,
                format!(
                    "add {} ignored (side {}, size {})",
                    event.order_id,
                    event.side.as_char(),
                    event.size
                ),
                event,
            );
            self.warnings.record(warning);
        }
        Some(self.book.snapshot(event))
    }

    fn on_cancel(&mut self, event: &MboEvent) -> Option<MbpSnapshot> {
        self.stats.cancels += 1;

        if let Some(resolved) = self.stitcher.resolve_cancel(event, &mut self.book) {
            self.stats.trades_resolved += 1;
            if !resolved.level_found {
                let snap = &resolved.snapshot;
                self.missing_level(snap.order_id, snap.price, snap.size, event.sequence);
            }
            return Some(resolved.snapshot);
        }

        if !self.book.cancel_order(event.side, event.price, event.size) {
            self.missing_level(event.order_id, event.price, event.size, event.sequence);
        }
        Some(self.book.snapshot(event))
    }

    fn on_trade(&mut self, event: &MboEvent) -> Option<MbpSnapshot> {
        self.stats.trades += 1;
        if !self.stitcher.begin_trade(event) {
            self.stats.trades_ignored += 1;
            let warning = self.event_warning(
                WarningCategory::NonDirectionalTrade,
                format!("trade {} has no side", event.order_id),
                event,
            );
            self.warnings.record(warning);
        }
        None
    }

    fn on_fill(&mut self, event: &MboEvent) -> Option<MbpSnapshot> {
        self.stats.fills += 1;
        if !self.stitcher.mark_fill(event) {
            self.stats.orphan_fills += 1;
            let warning = self.event_warning(
                WarningCategory::OrphanFill,
                format!("fill for order {} without pending trade", event.order_id),
                event,
            );
            self.warnings.record(warning);
        }
        None
    }

    fn on_clear(&mut self, event: &MboEvent, index: u64) -> Option<MbpSnapshot> {
        self.stats.clears += 1;

        if index == 1 && self.config.skip_initial_clear {
            self.stats.initial_clear_skipped = true;
            log::info!("Skipping initial clear action");
            return None;
        }

        self.book.clear();
        let warning = self.event_warning(
            WarningCategory::BookCleared,
            format!("book cleared at sequence {}", event.sequence),
            event,
        );
        self.warnings.record(warning);
        Some(self.book.snapshot(event))
    }

    fn on_unsupported(&mut self, event: &MboEvent) -> Option<MbpSnapshot> {
        self.stats.unsupported_actions += 1;
        let warning = self.event_warning(
            WarningCategory::UnsupportedAction,
            format!(
                "action {} for order {} ignored",
                event.action.as_char(),
                event.order_id
            ),
            event,
        );
        self.warnings.record(warning);
        None
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    fn event_warning(
        &mut self,
        category: WarningCategory,
        message: String,
        event: &MboEvent,
    ) -> crate::warnings::Warning {
        self.warnings
            .build(category, message)
            .with_order_id(event.order_id)
            .with_price(event.price)
            .with_size(event.size)
            .with_sequence(event.sequence)
            .with_event_index(self.stats.events_processed)
    }

    fn missing_level(&mut self, order_id: u64, price: i64, size: u32, sequence: u64) {
        self.stats.missing_levels += 1;
        let warning = self
            .warnings
            .build(
                WarningCategory::MissingLevel,
                format!(
                    "no level at {} for order {order_id} (size {size})",
                    format_price(price, 2)
                ),
            )
            .with_order_id(order_id)
            .with_price(price)
            .with_size(size)
            .with_sequence(sequence)
            .with_event_index(self.stats.events_processed);
        self.warnings.record(warning);
    }

    /// Count the snapshot, classify its top of book and pass it through.
    fn emit(&mut self, snapshot: MbpSnapshot) -> MbpSnapshot {
        self.stats.snapshots_emitted += 1;

        match snapshot.check_consistency() {
            BookConsistency::Crossed => {
                self.stats.crossed_snapshots += 1;
                if let (Some(bid), Some(ask)) = (snapshot.best_bid(), snapshot.best_ask()) {
                    let warning = self
                        .warnings
                        .build(
                            WarningCategory::CrossedBook,
                            format!(
                                "crossed book: bid={} > ask={} (event #{})",
                                format_price(bid, 4),
                                format_price(ask, 4),
                                self.stats.events_processed
                            ),
                        )
                        .with_sequence(snapshot.sequence)
                        .with_event_index(self.stats.events_processed);
                    self.warnings.record(warning);
                }
            }
            BookConsistency::Locked => {
                self.stats.locked_snapshots += 1;
                if self.config.log_warnings {
                    if let Some(bid) = snapshot.best_bid() {
                        log::debug!(
                            "Locked book: bid=ask={} (event #{})",
                            format_price(bid, 4),
                            self.stats.events_processed
                        );
                    }
                }
            }
            BookConsistency::Valid | BookConsistency::Empty => {}
        }

        snapshot
    }

    fn refresh_depth_stats(&mut self) {
        self.stats.pending_trades = self.stitcher.len();
        self.stats.bid_levels = self.book.bid_levels();
        self.stats.ask_levels = self.book.ask_levels();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LevelSnapshot, Side};

    fn px(dollars: f64) -> i64 {
        (dollars * 1e9).round() as i64
    }

    fn ev(order_id: u64, action: Action, side: Side, price: f64, size: u32) -> MboEvent {
        MboEvent::new(order_id, action, side, px(price), size)
    }

    fn quiet() -> MbpReconstructor {
        MbpReconstructor::with_config(ReconstructorConfig::new().with_logging(false))
    }

    // =========================================================================
    // Basic dispatch
    // =========================================================================

    #[test]
    fn test_adds_and_cancel() {
        let mut r = quiet();
        r.process_event(&ev(1001, Action::Add, Side::Bid, 10.50, 100));
        r.process_event(&ev(1002, Action::Add, Side::Bid, 10.25, 200));
        let snap = r
            .process_event(&ev(1003, Action::Add, Side::Ask, 10.75, 150))
            .unwrap();

        assert_eq!(snap.bids[0], LevelSnapshot::new(px(10.50), 100, 1));
        assert_eq!(snap.bids[1], LevelSnapshot::new(px(10.25), 200, 1));
        assert_eq!(snap.asks[0], LevelSnapshot::new(px(10.75), 150, 1));

        let snap = r
            .process_event(&ev(1001, Action::Cancel, Side::Bid, 10.50, 100))
            .unwrap();
        assert_eq!(snap.bids[0], LevelSnapshot::new(px(10.25), 200, 1));
        assert_eq!(snap.bids[1], LevelSnapshot::default());
        assert_eq!(snap.action, Action::Cancel);
        assert_eq!(snap.order_id, 1001);
        assert_eq!(r.stats().snapshots_emitted, 4);
    }

    #[test]
    fn test_trade_fill_cancel_emits_one_snapshot() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Ask, 10.75, 150));

        assert!(r.process_event(&ev(77, Action::Trade, Side::Bid, 10.75, 50)).is_none());
        assert!(r.process_event(&ev(77, Action::Fill, Side::Bid, 10.75, 50)).is_none());
        let snap = r
            .process_event(&ev(900, Action::Cancel, Side::Bid, 10.75, 50))
            .unwrap();

        assert_eq!(snap.action, Action::Trade);
        assert_eq!(snap.side, Side::Ask);
        assert_eq!(snap.order_id, 77);
        assert_eq!(snap.asks[0], LevelSnapshot::new(px(10.75), 100, 1));
        assert_eq!(r.stats().trades_resolved, 1);
        assert_eq!(r.stats().pending_trades, 0);
        assert!(r.finish().is_empty());
    }

    #[test]
    fn test_resting_side_policy_matches_resting_cancel() {
        let config = ReconstructorConfig::new()
            .with_logging(false)
            .with_cancel_match(CancelMatchPolicy::RestingSide);
        let mut r = MbpReconstructor::with_config(config);
        r.process_event(&ev(1, Action::Add, Side::Ask, 10.75, 150));
        r.process_event(&ev(77, Action::Trade, Side::Bid, 10.75, 50));
        r.process_event(&ev(77, Action::Fill, Side::Ask, 10.75, 50));
        let snap = r
            .process_event(&ev(1, Action::Cancel, Side::Ask, 10.75, 50))
            .unwrap();

        assert_eq!(snap.action, Action::Trade);
        assert_eq!(snap.asks[0], LevelSnapshot::new(px(10.75), 100, 1));
    }

    #[test]
    fn test_non_directional_trade_is_ignored() {
        let mut r = quiet();
        assert!(r.process_event(&ev(5, Action::Trade, Side::None, 10.0, 10)).is_none());
        assert_eq!(r.stats().trades_ignored, 1);
        assert!(r.stitcher().is_empty());
        assert_eq!(
            r.warnings().count_by_category(WarningCategory::NonDirectionalTrade),
            1
        );
    }

    #[test]
    fn test_orphan_fill() {
        let mut r = quiet();
        assert!(r.process_event(&ev(5, Action::Fill, Side::Bid, 10.0, 10)).is_none());
        assert_eq!(r.stats().orphan_fills, 1);
    }

    #[test]
    fn test_cancel_missing_level_still_emits() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Ask, 11.0, 10));
        let snap = r
            .process_event(&ev(2, Action::Cancel, Side::Bid, 10.5, 100))
            .unwrap();
        assert_eq!(snap.asks[0], LevelSnapshot::new(px(11.0), 10, 1));
        assert_eq!(r.stats().missing_levels, 1);
        assert_eq!(r.warnings().count_by_category(WarningCategory::MissingLevel), 1);
    }

    // =========================================================================
    // Clear handling
    // =========================================================================

    #[test]
    fn test_initial_clear_skipped() {
        let mut r = quiet();
        assert!(r.process_event(&ev(0, Action::Clear, Side::None, 0.0, 0)).is_none());
        assert!(r.stats().initial_clear_skipped);

        r.process_event(&ev(1, Action::Add, Side::Bid, 10.0, 10));
        let snap = r
            .process_event(&ev(0, Action::Clear, Side::None, 0.0, 0))
            .unwrap();
        assert_eq!(snap.action, Action::Clear);
        assert_eq!(snap.active_bid_levels(), 0);
        assert!(r.book().is_empty());
        assert_eq!(r.stats().clears, 2);
    }

    #[test]
    fn test_initial_clear_kept_when_configured() {
        let config = ReconstructorConfig::new()
            .with_logging(false)
            .with_skip_initial_clear(false);
        let mut r = MbpReconstructor::with_config(config);
        let snap = r.process_event(&ev(0, Action::Clear, Side::None, 0.0, 0));
        assert!(snap.is_some());
        assert!(!r.stats().initial_clear_skipped);
    }

    // =========================================================================
    // Other actions
    // =========================================================================

    #[test]
    fn test_modify_and_none_are_ignored() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Bid, 10.0, 10));
        assert!(r.process_event(&ev(1, Action::Modify, Side::Bid, 10.5, 20)).is_none());
        assert!(r.process_event(&ev(0, Action::None, Side::None, 0.0, 0)).is_none());
        assert_eq!(r.stats().unsupported_actions, 2);
        assert_eq!(r.book().best_bid(), Some(px(10.0)));
    }

    #[test]
    fn test_zero_size_add_emits_unchanged_snapshot() {
        let mut r = quiet();
        let snap = r.process_event(&ev(1, Action::Add, Side::Bid, 10.0, 0)).unwrap();
        assert_eq!(snap.active_bid_levels(), 0);
        assert_eq!(r.stats().rejected_adds, 1);
        assert_eq!(r.warnings().count_by_category(WarningCategory::DataQuality), 1);
    }

    // =========================================================================
    // End of stream
    // =========================================================================

    #[test]
    fn test_finish_applies_filled_and_drops_unfilled() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Ask, 10.75, 150));
        r.process_event(&ev(2, Action::Add, Side::Bid, 10.50, 80));
        r.process_event(&ev(77, Action::Trade, Side::Bid, 10.75, 50));
        r.process_event(&ev(77, Action::Fill, Side::Ask, 10.75, 50));
        r.process_event(&ev(78, Action::Trade, Side::Ask, 10.50, 30));
        assert_eq!(r.stats().pending_trades, 2);

        let trailing = r.finish();
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].action, Action::Trade);
        assert_eq!(trailing[0].side, Side::Ask);
        assert_eq!(trailing[0].asks[0], LevelSnapshot::new(px(10.75), 100, 1));
        assert_eq!(trailing[0].bids[0], LevelSnapshot::new(px(10.50), 80, 1));

        assert_eq!(r.stats().trades_flushed, 1);
        assert_eq!(r.stats().trades_abandoned, 1);
        assert_eq!(r.stats().pending_trades, 0);
        assert_eq!(r.warnings().count_by_category(WarningCategory::ImplicitCancel), 1);
        assert_eq!(r.warnings().count_by_category(WarningCategory::AbandonedTrade), 1);
        assert!(r.finish().is_empty());
    }

    #[test]
    fn test_finish_emits_in_ascending_order_id() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Ask, 10.75, 500));
        r.process_event(&ev(30, Action::Trade, Side::Bid, 10.75, 100));
        r.process_event(&ev(30, Action::Fill, Side::Ask, 10.75, 100));
        r.process_event(&ev(5, Action::Trade, Side::Bid, 10.75, 40));
        r.process_event(&ev(5, Action::Fill, Side::Ask, 10.75, 40));

        let trailing = r.finish();
        let ids: Vec<u64> = trailing.iter().map(|s| s.order_id).collect();
        assert_eq!(ids, vec![5, 30]);
        assert_eq!(trailing[0].asks[0].size, 460);
        assert_eq!(trailing[1].asks[0].size, 360);
    }

    #[test]
    fn test_colliding_cancel_resolves_lowest_order_id() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Ask, 10.75, 500));
        r.process_event(&ev(20, Action::Trade, Side::Bid, 10.75, 100));
        r.process_event(&ev(10, Action::Trade, Side::Bid, 10.75, 40));

        let snap = r
            .process_event(&ev(900, Action::Cancel, Side::Bid, 10.75, 40))
            .unwrap();
        assert_eq!(snap.order_id, 10);
        assert_eq!(snap.asks[0], LevelSnapshot::new(px(10.75), 460, 1));
        assert!(r.stitcher().get(20).is_some());
    }

    // =========================================================================
    // Consistency tracking
    // =========================================================================

    #[test]
    fn test_crossed_and_locked_books_are_counted_not_altered() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Bid, 10.0, 10));
        let locked = r.process_event(&ev(2, Action::Add, Side::Ask, 10.0, 10)).unwrap();
        assert!(locked.check_consistency().is_locked());
        let crossed = r.process_event(&ev(3, Action::Add, Side::Ask, 9.5, 10)).unwrap();
        assert!(crossed.check_consistency().is_crossed());
        assert_eq!(crossed.asks[0], LevelSnapshot::new(px(9.5), 10, 1));

        assert_eq!(r.stats().locked_snapshots, 1);
        assert_eq!(r.stats().crossed_snapshots, 1);
        assert_eq!(r.warnings().count_by_category(WarningCategory::CrossedBook), 1);
    }

    #[test]
    fn test_process_events_includes_flush() {
        let mut r = quiet();
        let events = vec![
            ev(1, Action::Add, Side::Ask, 10.75, 150),
            ev(77, Action::Trade, Side::Bid, 10.75, 50),
            ev(77, Action::Fill, Side::Ask, 10.75, 50),
        ];
        let out = r.process_events(&events);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].action, Action::Trade);
    }

    #[test]
    fn test_reset() {
        let mut r = quiet();
        r.process_event(&ev(1, Action::Add, Side::Ask, 10.75, 150));
        r.process_event(&ev(77, Action::Trade, Side::Bid, 10.75, 50));
        r.reset();
        assert!(r.book().is_empty());
        assert!(r.stitcher().is_empty());
        assert_eq!(r.stats(), &ReconstructorStats::default());
    }
}
