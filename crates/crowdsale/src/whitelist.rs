use crate::errors::{CrowdsaleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tranche_primitives::Address;

/// Whether membership is still required once the guaranteed window is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistPolicy {
    /// Only the guaranteed intervals are restricted.
    #[default]
    GuaranteedWindow,
    /// Every interval is restricted to members.
    Always,
}

impl FromStr for WhitelistPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guaranteed_window" | "guaranteed-window" => Ok(WhitelistPolicy::GuaranteedWindow),
            "always" => Ok(WhitelistPolicy::Always),
            other => Err(format!("unknown whitelist policy '{other}'")),
        }
    }
}

impl fmt::Display for WhitelistPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhitelistPolicy::GuaranteedWindow => f.write_str("guaranteed_window"),
            WhitelistPolicy::Always => f.write_str("always"),
        }
    }
}

/// Allow-list gating participation during the guaranteed intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whitelist {
    members: HashSet<Address>,
    guaranteed_intervals: u64,
    policy: WhitelistPolicy,
}

impl Whitelist {
    pub fn new(guaranteed_intervals: u64, policy: WhitelistPolicy) -> Self {
        Self {
            members: HashSet::new(),
            guaranteed_intervals,
            policy,
        }
    }

    /// Add every account or none; returns the accounts that were new.
    pub fn add_all(&mut self, accounts: &[Address]) -> Result<Vec<Address>> {
        if accounts.iter().any(Address::is_zero) {
            return Err(CrowdsaleError::ZeroAddress);
        }
        Ok(accounts
            .iter()
            .filter(|account| self.members.insert(**account))
            .copied()
            .collect())
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    pub fn requires_membership(&self, interval: u64) -> bool {
        interval < self.guaranteed_intervals || self.policy == WhitelistPolicy::Always
    }

    pub fn admits(&self, account: &Address, interval: u64) -> bool {
        !self.requires_membership(interval) || self.contains(account)
    }

    pub fn policy(&self) -> WhitelistPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guaranteed_window_then_open() {
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let mut list = Whitelist::new(2, WhitelistPolicy::GuaranteedWindow);
        list.add_all(&[alice]).unwrap();

        assert!(list.admits(&alice, 0));
        assert!(!list.admits(&bob, 1));
        assert!(list.admits(&bob, 2));
    }

    #[test]
    fn always_policy_keeps_gate_closed() {
        let bob = Address::derive("bob");
        let list = Whitelist::new(2, WhitelistPolicy::Always);
        assert!(!list.admits(&bob, 5));
    }

    #[test]
    fn zero_address_rejects_whole_batch() {
        let alice = Address::derive("alice");
        let mut list = Whitelist::new(1, WhitelistPolicy::default());
        let err = list.add_all(&[alice, Address::ZERO]).unwrap_err();
        assert!(matches!(err, CrowdsaleError::ZeroAddress));
        assert!(list.is_empty());
    }

    #[test]
    fn duplicates_are_idempotent() {
        let alice = Address::derive("alice");
        let mut list = Whitelist::new(1, WhitelistPolicy::default());
        assert_eq!(list.add_all(&[alice, alice]).unwrap(), vec![alice]);
        assert!(list.add_all(&[alice]).unwrap().is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("always".parse::<WhitelistPolicy>().unwrap(), WhitelistPolicy::Always);
        assert_eq!(
            "Guaranteed_Window".parse::<WhitelistPolicy>().unwrap(),
            WhitelistPolicy::GuaranteedWindow
        );
        assert!("sometimes".parse::<WhitelistPolicy>().is_err());
    }
}
