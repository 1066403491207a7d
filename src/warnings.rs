//! Diagnostic tracking for MBO → MBP reconstruction.
//!
//! The book never fails on odd input: a cancel against a missing level, a
//! fill nobody asked for or a trade that never completes are all absorbed
//! silently. This module keeps a record of those events so a run can be
//! audited afterwards without changing its output.
//!
//! Warnings are categorised, counted in full and stored up to a
//! per-category cap. The whole record can be exported as JSON.
//!
//! # Example
//!
//! ```
//! use mbo_mbp_reconstructor::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_simple(WarningCategory::OrphanFill, "fill for unknown order 42");
//! assert_eq!(tracker.count_by_category(WarningCategory::OrphanFill), 1);
//! ```

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{MbpError, Result};

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Cancel or trade against a price with no level on that side
    MissingLevel,

    /// Fill whose order id has no pending trade
    OrphanFill,

    /// Pending trade dropped at end of stream without a fill
    AbandonedTrade,

    /// Filled trade applied at end of stream without its cancel
    ImplicitCancel,

    /// Trade with no side
    NonDirectionalTrade,

    /// Modify / None action, not applied to the book
    UnsupportedAction,

    /// Emitted snapshot with best bid >= best ask
    CrossedBook,

    /// Book was cleared by the feed
    BookCleared,

    /// Record accepted but suspicious (zero-size add, add without side)
    DataQuality,
}

impl WarningCategory {
    /// Every category, in reporting order.
    pub const ALL: [WarningCategory; 9] = [
        WarningCategory::MissingLevel,
        WarningCategory::OrphanFill,
        WarningCategory::AbandonedTrade,
        WarningCategory::ImplicitCancel,
        WarningCategory::NonDirectionalTrade,
        WarningCategory::UnsupportedAction,
        WarningCategory::CrossedBook,
        WarningCategory::BookCleared,
        WarningCategory::DataQuality,
    ];

    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::MissingLevel => "MISSING_LEVEL",
            WarningCategory::OrphanFill => "ORPHAN_FILL",
            WarningCategory::AbandonedTrade => "ABANDONED_TRADE",
            WarningCategory::ImplicitCancel => "IMPLICIT_CANCEL",
            WarningCategory::NonDirectionalTrade => "NON_DIRECTIONAL_TRADE",
            WarningCategory::UnsupportedAction => "UNSUPPORTED_ACTION",
            WarningCategory::CrossedBook => "CROSSED_BOOK",
            WarningCategory::BookCleared => "BOOK_CLEARED",
            WarningCategory::DataQuality => "DATA_QUALITY",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::MissingLevel => 2,
            WarningCategory::OrphanFill => 1,
            WarningCategory::AbandonedTrade => 2,
            WarningCategory::ImplicitCancel => 1,
            WarningCategory::NonDirectionalTrade => 1,
            WarningCategory::UnsupportedAction => 1,
            WarningCategory::CrossedBook => 3,
            WarningCategory::BookCleared => 1,
            WarningCategory::DataQuality => 2,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID (auto-incremented, starts at 1)
    pub id: u64,

    /// Warning category
    pub category: WarningCategory,

    /// Human-readable message
    pub message: String,

    /// 1-based position of the triggering event in the stream
    pub event_index: Option<u64>,

    /// Related order ID (if applicable)
    pub order_id: Option<u64>,

    /// Related price (if applicable)
    pub price: Option<i64>,

    /// Related size (if applicable)
    pub size: Option<u32>,

    /// Venue sequence number of the triggering event
    pub sequence: Option<u64>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            event_index: None,
            order_id: None,
            price: None,
            size: None,
            sequence: None,
        }
    }

    /// Set the stream position.
    pub fn with_event_index(mut self, index: u64) -> Self {
        self.event_index = Some(index);
        self
    }

    /// Set the order ID.
    pub fn with_order_id(mut self, order_id: u64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the size.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings, including ones past the storage cap
    pub total: u64,

    /// Count by category name
    pub by_category: BTreeMap<String, u64>,

    /// Count by severity
    pub by_severity: BTreeMap<u8, u64>,

    /// Stream position of the first stored warning
    pub first_event: Option<u64>,

    /// Stream position of the last stored warning
    pub last_event: Option<u64>,

    /// Number of unique order IDs among stored warnings
    pub unique_orders: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings stored per category (all are counted)
    pub max_per_category: usize,

    /// Whether to forward warnings to the `log` facade
    pub log_warnings: bool,

    /// Minimum severity forwarded to the log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_per_category: 10_000,
            log_warnings: true,
            min_log_severity: 1,
        }
    }
}

impl WarningTrackerConfig {
    /// Set the per-category storage cap.
    pub fn with_max_per_category(mut self, max: usize) -> Self {
        self.max_per_category = max;
        self
    }

    /// Enable/disable log forwarding.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }

    /// Set the minimum severity forwarded to the log.
    pub fn with_min_log_severity(mut self, severity: u8) -> Self {
        self.min_log_severity = severity;
        self
    }
}

#[derive(Serialize)]
struct WarningReport<'a> {
    summary: WarningSummary,
    warnings: &'a [Warning],
}

/// Collects diagnostics for one reconstruction run.
#[derive(Debug, Clone)]
pub struct WarningTracker {
    /// Configuration
    config: WarningTrackerConfig,

    /// Stored warnings, in recording order
    warnings: Vec<Warning>,

    /// Next ID to hand out
    next_id: u64,

    /// Count by category (all recorded, stored or not)
    category_counts: AHashMap<WarningCategory, u64>,

    /// Unique order IDs among stored warnings
    unique_orders: ahash::AHashSet<u64>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: AHashMap::new(),
            unique_orders: ahash::AHashSet::new(),
        }
    }

    /// Start a warning with the next free ID. Pass it to [`record`](Self::record).
    pub fn build(&mut self, category: WarningCategory, message: impl Into<String>) -> Warning {
        let id = self.next_id;
        self.next_id += 1;
        Warning::new(id, category, message)
    }

    /// Record a warning.
    ///
    /// Returns the warning ID if it was stored, or `None` if the category
    /// is already at its storage cap (the warning is still counted).
    pub fn record(&mut self, warning: Warning) -> Option<u64> {
        if self.config.log_warnings && warning.category.severity() >= self.config.min_log_severity
        {
            if warning.category.severity() >= 3 {
                log::warn!("[{}] {}", warning.category.name(), warning.message);
            } else {
                log::debug!("[{}] {}", warning.category.name(), warning.message);
            }
        }

        let count = self.category_counts.entry(warning.category).or_insert(0);
        *count += 1;
        if *count as usize > self.config.max_per_category {
            return None;
        }

        if let Some(order_id) = warning.order_id {
            self.unique_orders.insert(order_id);
        }
        let id = warning.id;
        self.warnings.push(warning);
        Some(id)
    }

    /// Record a simple warning with just category and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
    ) -> Option<u64> {
        let warning = self.build(category, message);
        self.record(warning)
    }

    /// Number of stored warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if no warnings have been stored.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Total count including warnings past the storage cap.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Get all stored warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get stored warnings by category.
    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = BTreeMap::new();
        let mut by_severity = BTreeMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            by_category,
            by_severity,
            first_event: self.warnings.first().and_then(|w| w.event_index),
            last_event: self.warnings.last().and_then(|w| w.event_index),
            unique_orders: self.unique_orders.len() as u64,
        }
    }

    /// Serialize summary and stored warnings as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        let report = WarningReport {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_string_pretty(&report).map_err(|e| MbpError::generic(e.to_string()))
    }

    /// Export summary and stored warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings and counters.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.unique_orders.clear();
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
