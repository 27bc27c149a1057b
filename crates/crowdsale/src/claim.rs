//! Settlement math
//!
//! An interval sells at most `tokens_per_interval`. Contributors share it in
//! proportion to `contribution / max(interval_total, reserve_amount)`:
//! undersubscribed intervals leave part of the bucket unclaimed, while
//! oversubscribed intervals hand out the whole bucket less rounding dust.

use crate::errors::{CrowdsaleError, Result};
use serde::{Deserialize, Serialize};
use tranche_primitives::{mul_div, Address, Amount, UNIT};

/// Tokens owed for `contribution` in an interval (floor division).
pub fn entitlement(
    contribution: Amount,
    tokens_per_interval: Amount,
    interval_total: Amount,
    reserve_amount: Amount,
) -> Result<Amount> {
    let denominator = interval_total.max(reserve_amount);
    mul_div(contribution, tokens_per_interval, denominator)
        .ok_or(CrowdsaleError::Overflow("claim entitlement"))
}

/// Token base units bought per whole native unit if the interval closed with
/// `projected_total` contributed.
pub fn token_rate(
    tokens_per_interval: Amount,
    reserve_amount: Amount,
    projected_total: Amount,
) -> Result<Amount> {
    let denominator = projected_total.max(reserve_amount);
    mul_div(tokens_per_interval, UNIT, denominator).ok_or(CrowdsaleError::Overflow("token rate"))
}

/// Result of settling a single interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub account: Address,
    pub interval: u64,
    pub contribution: Amount,
    pub tokens: Amount,
}

/// Result of settling every claimable interval at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAllReceipt {
    pub account: Address,
    pub settled: Vec<ClaimReceipt>,
    pub tokens: Amount,
}
