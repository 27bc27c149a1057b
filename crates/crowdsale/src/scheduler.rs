//! Ledger position to interval mapping.

use serde::{Deserialize, Serialize};
use tranche_primitives::LedgerPosition;

/// Maps ledger positions onto fixed-length sale intervals.
///
/// Holds no counters: the interval is recomputed from the position every
/// time, so it can never drift from the ledger's own ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalScheduler {
    start: LedgerPosition,
    interval_length: u64,
    number_of_intervals: u64,
}

impl IntervalScheduler {
    pub fn new(start: LedgerPosition, interval_length: u64, number_of_intervals: u64) -> Self {
        Self {
            start,
            interval_length: interval_length.max(1),
            number_of_intervals,
        }
    }

    pub fn start_position(&self) -> LedgerPosition {
        self.start
    }

    pub fn interval_length(&self) -> u64 {
        self.interval_length
    }

    pub fn number_of_intervals(&self) -> u64 {
        self.number_of_intervals
    }

    /// Interval index at `position`. Indices `>= number_of_intervals` mean
    /// the sale window has closed.
    pub fn interval_at(&self, position: LedgerPosition) -> u64 {
        position.saturating_sub(self.start) / self.interval_length
    }

    /// First position past the last interval.
    pub fn end_position(&self) -> LedgerPosition {
        self.start
            .saturating_add(self.number_of_intervals.saturating_mul(self.interval_length))
    }

    /// First position of interval `index`.
    pub fn interval_start(&self, index: u64) -> LedgerPosition {
        self.start
            .saturating_add(index.saturating_mul(self.interval_length))
    }

    pub fn is_closed(&self, position: LedgerPosition) -> bool {
        position >= self.end_position()
    }
}
