//! Per-interval contribution book.

use crate::errors::{CrowdsaleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tranche_primitives::{Address, Amount};

/// One account's position in one interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub contributed: Amount,
    pub claimed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IntervalBook {
    total: Amount,
    records: HashMap<Address, ParticipationRecord>,
}

/// Contributions per interval and account, with interval totals and the
/// cumulative total across the whole sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipationLedger {
    intervals: BTreeMap<u64, IntervalBook>,
    cumulative: Amount,
}

impl ParticipationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `value` to `account` in `interval`; returns the new interval total.
    pub fn contribute(&mut self, interval: u64, account: Address, value: Amount) -> Result<Amount> {
        let cumulative = self
            .cumulative
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow("cumulative proceeds"))?;
        let total = self
            .total(interval)
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow("interval total"))?;
        let contributed = self
            .contribution(interval, &account)
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow("contribution"))?;

        let book = self.intervals.entry(interval).or_default();
        book.total = total;
        book.records.entry(account).or_default().contributed = contributed;
        self.cumulative = cumulative;
        Ok(total)
    }

    pub fn total(&self, interval: u64) -> Amount {
        self.intervals.get(&interval).map_or(0, |book| book.total)
    }

    pub fn cumulative(&self) -> Amount {
        self.cumulative
    }

    pub fn record(&self, interval: u64, account: &Address) -> Option<ParticipationRecord> {
        self.intervals
            .get(&interval)
            .and_then(|book| book.records.get(account))
            .copied()
    }

    pub fn contribution(&self, interval: u64, account: &Address) -> Amount {
        self.record(interval, account).map_or(0, |r| r.contributed)
    }

    pub fn is_claimed(&self, interval: u64, account: &Address) -> bool {
        self.record(interval, account).is_some_and(|r| r.claimed)
    }

    /// Flip the claimed flag; fails if there is no record or it was already set.
    pub fn mark_claimed(&mut self, interval: u64, account: &Address) -> Result<()> {
        let record = self
            .intervals
            .get_mut(&interval)
            .and_then(|book| book.records.get_mut(account))
            .ok_or(CrowdsaleError::NoContribution {
                account: *account,
                interval,
            })?;
        if record.claimed {
            return Err(CrowdsaleError::AlreadyClaimed {
                account: *account,
                interval,
            });
        }
        record.claimed = true;
        Ok(())
    }

    /// Intervals below `upto` where `account` contributed and has not claimed.
    pub fn unclaimed(&self, account: &Address, upto: u64) -> Vec<(u64, Amount)> {
        self.intervals
            .range(..upto)
            .filter_map(|(interval, book)| {
                book.records
                    .get(account)
                    .filter(|r| !r.claimed && r.contributed > 0)
                    .map(|r| (*interval, r.contributed))
            })
            .collect()
    }
}
