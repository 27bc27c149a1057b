use crate::errors::{CrowdsaleError, Result};
use crate::hidden_cap::HiddenCap;
use serde::{Deserialize, Serialize};
use tranche_primitives::{Address, Amount};

/// Construction-time sale configuration; immutable afterwards.
#[derive(Debug, Clone)]
pub struct SaleConfig {
    pub token: Address,
    pub number_of_intervals: u64,
    pub guaranteed_intervals: u64,
    pub hidden_cap: HiddenCap,
}

impl SaleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.token.is_zero() {
            return Err(CrowdsaleError::InvalidConfig("token address must not be zero".into()));
        }
        if self.number_of_intervals == 0 {
            return Err(CrowdsaleError::InvalidConfig(
                "sale needs at least one interval".into(),
            ));
        }
        if self.guaranteed_intervals > self.number_of_intervals {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "guaranteed intervals ({}) exceed the sale length ({})",
                self.guaranteed_intervals, self.number_of_intervals
            )));
        }
        Ok(())
    }
}

/// Inputs to `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleParams {
    /// Reference price of one native unit (18 decimals).
    pub eth_price: Amount,
    /// Lowest reserve price, reference currency.
    pub floor: Amount,
    /// Starting reserve price, reference currency.
    pub reserve_start: Amount,
    /// Highest reserve price, reference currency.
    pub ceiling: Amount,
    /// Tokens pulled into the sale and split evenly across intervals.
    pub allocation: Amount,
}

impl SaleParams {
    pub fn validate(&self, number_of_intervals: u64) -> Result<()> {
        if self.floor == 0 {
            return Err(CrowdsaleError::InvalidConfig("floor must be positive".into()));
        }
        let min_ceiling = self
            .floor
            .checked_add(u128::from(number_of_intervals))
            .ok_or(CrowdsaleError::Overflow("minimum ceiling"))?;
        if self.ceiling < min_ceiling {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "ceiling {} is below floor + number of intervals ({min_ceiling})",
                self.ceiling
            )));
        }
        if self.eth_price < self.ceiling {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "reference price {} is below the ceiling {}",
                self.eth_price, self.ceiling
            )));
        }
        if self.allocation == 0 {
            return Err(CrowdsaleError::InvalidConfig("allocation must be positive".into()));
        }
        if self.allocation < u128::from(number_of_intervals) {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "allocation {} cannot cover {number_of_intervals} intervals",
                self.allocation
            )));
        }
        Ok(())
    }

    pub fn tokens_per_interval(&self, number_of_intervals: u64) -> Amount {
        self.allocation / u128::from(number_of_intervals.max(1))
    }
}
