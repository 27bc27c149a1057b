use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a distribution contract. Transitions only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Constructed, not yet funded.
    #[default]
    Created,
    /// Funded and accepting operations.
    Active,
    /// Terminal: no new participation or claims on vesting, recovery allowed.
    Ended,
}

impl Stage {
    /// Whether moving from `self` to `next` respects the forward-only order.
    pub fn can_advance_to(self, next: Stage) -> bool {
        next > self
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "created",
            Stage::Active => "active",
            Stage::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_only_move_forward() {
        assert!(Stage::Created.can_advance_to(Stage::Active));
        assert!(Stage::Active.can_advance_to(Stage::Ended));
        assert!(Stage::Created.can_advance_to(Stage::Ended));
        assert!(!Stage::Ended.can_advance_to(Stage::Active));
        assert!(!Stage::Active.can_advance_to(Stage::Active));
    }
}
