//! Ledger position source.
//!
//! Contracts never read wall-clock time. Every interval and vesting
//! computation is a pure function of the ledger position reported by an
//! injected [`LedgerClock`], which makes the math testable without a ledger.

use parking_lot::RwLock;
use std::sync::Arc;

/// Monotonic position in the ledger's total order (block height).
pub type LedgerPosition = u64;

/// Source of the current ledger position.
pub trait LedgerClock: Send + Sync {
    /// Position at which the operation being processed is included.
    fn position(&self) -> LedgerPosition;
}

/// Manually driven clock shared between contract instances.
///
/// Clones share the same underlying counter, so advancing one handle moves
/// every contract that was constructed with a clone of it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    position: Arc<RwLock<LedgerPosition>>,
}

impl ManualClock {
    pub fn new(start: LedgerPosition) -> Self {
        Self {
            position: Arc::new(RwLock::new(start)),
        }
    }

    /// Move forward by `positions`.
    pub fn advance(&self, positions: u64) -> LedgerPosition {
        let mut current = self.position.write();
        *current = current.saturating_add(positions);
        *current
    }

    /// Jump to `target`. Positions never move backwards; an earlier target
    /// is ignored and the current position returned.
    pub fn set(&self, target: LedgerPosition) -> LedgerPosition {
        let mut current = self.position.write();
        if target > *current {
            *current = target;
        }
        *current
    }
}

impl LedgerClock for ManualClock {
    fn position(&self) -> LedgerPosition {
        *self.position.read()
    }
}

impl<T: LedgerClock + ?Sized> LedgerClock for Arc<T> {
    fn position(&self) -> LedgerPosition {
        (**self).position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_position() {
        let clock = ManualClock::new(10);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.position(), 15);
    }

    #[test]
    fn set_never_moves_backwards() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.set(50), 100);
        assert_eq!(clock.set(120), 120);
        assert_eq!(clock.position(), 120);
    }

    #[test]
    fn usable_as_trait_object() {
        let clock = ManualClock::new(7);
        let shared: Arc<dyn LedgerClock> = Arc::new(clock.clone());
        clock.advance(3);
        assert_eq!(shared.position(), 10);
    }
}
