//! Allocation book
//!
//! Tracks the unallocated pool and one record per account. Tokens only move
//! between the pool and the records, or out of a record through a claim, so
//! `unallocated + Σ allocated_balance` always equals what the distributor
//! holds.

use crate::errors::{AirdropError, Result};
use crate::vesting::Release;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tranche_primitives::{Address, Amount, LedgerPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Basis for the per-period release.
    pub original_allocation: Amount,
    /// Still to be released.
    pub allocated_balance: Amount,
    pub last_claim_position: LedgerPosition,
    pub claimed_total: Amount,
}

impl AllocationRecord {
    /// A record whose balance reached zero stays closed.
    pub fn is_closed(&self) -> bool {
        self.allocated_balance == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationBook {
    records: HashMap<Address, AllocationRecord>,
    unallocated: Amount,
    funded: Amount,
    distributed: Amount,
}

impl AllocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add freshly pulled tokens to the unallocated pool.
    pub fn fund(&mut self, amount: Amount) -> Result<()> {
        self.unallocated = self
            .unallocated
            .checked_add(amount)
            .ok_or(AirdropError::Overflow("unallocated pool"))?;
        self.funded = self
            .funded
            .checked_add(amount)
            .ok_or(AirdropError::Overflow("funded allocation"))?;
        Ok(())
    }

    /// Move `amount` from the pool to `account`. New accounts start vesting
    /// at `now`; existing open accounts keep their claim position.
    pub fn allocate(&mut self, account: Address, amount: Amount, now: LedgerPosition) -> Result<()> {
        if amount > self.unallocated {
            return Err(AirdropError::InsufficientPool {
                available: self.unallocated,
                requested: amount,
            });
        }
        let record = match self.records.get(&account) {
            Some(record) if record.is_closed() => return Err(AirdropError::RecordClosed(account)),
            Some(record) => AllocationRecord {
                original_allocation: record
                    .original_allocation
                    .checked_add(amount)
                    .ok_or(AirdropError::Overflow("original allocation"))?,
                allocated_balance: record
                    .allocated_balance
                    .checked_add(amount)
                    .ok_or(AirdropError::Overflow("allocated balance"))?,
                ..*record
            },
            None => AllocationRecord {
                original_allocation: amount,
                allocated_balance: amount,
                last_claim_position: now,
                claimed_total: 0,
            },
        };
        let distributed = self
            .distributed
            .checked_add(amount)
            .ok_or(AirdropError::Overflow("distributed total"))?;

        self.records.insert(account, record);
        self.unallocated -= amount;
        self.distributed = distributed;
        Ok(())
    }

    /// Return `amount` of `account`'s remaining balance to the pool.
    pub fn deallocate(&mut self, account: Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(&account);
        if amount > available {
            return Err(AirdropError::InsufficientAllocation {
                account,
                available,
                requested: amount,
            });
        }
        let unallocated = self
            .unallocated
            .checked_add(amount)
            .ok_or(AirdropError::Overflow("unallocated pool"))?;
        if let Some(record) = self.records.get_mut(&account) {
            record.allocated_balance -= amount;
            record.original_allocation = record.original_allocation.saturating_sub(amount);
        }
        self.unallocated = unallocated;
        self.distributed = self.distributed.saturating_sub(amount);
        Ok(())
    }

    /// Record a release that has already been paid out.
    pub fn settle(&mut self, account: &Address, release: &Release) -> Result<()> {
        let record = self
            .records
            .get_mut(account)
            .ok_or(AirdropError::NothingAllocated(*account))?;
        if release.amount > record.allocated_balance {
            return Err(AirdropError::InsufficientAllocation {
                account: *account,
                available: record.allocated_balance,
                requested: release.amount,
            });
        }
        record.allocated_balance -= release.amount;
        record.claimed_total = record.claimed_total.saturating_add(release.amount);
        record.last_claim_position = release.next_claim_position;
        Ok(())
    }

    pub fn record(&self, account: &Address) -> Option<&AllocationRecord> {
        self.records.get(account)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.records.get(account).map_or(0, |r| r.allocated_balance)
    }

    pub fn unallocated(&self) -> Amount {
        self.unallocated
    }

    pub fn funded(&self) -> Amount {
        self.funded
    }

    pub fn distributed(&self) -> Amount {
        self.distributed
    }

    /// Σ allocated_balance over every record.
    pub fn outstanding(&self) -> Amount {
        self.records
            .values()
            .fold(0u128, |sum, r| sum.saturating_add(r.allocated_balance))
    }
}
