//! Tranche vested airdrop
//!
//! A funded pool is allocated to accounts by Managers. Holders claim a fixed
//! share of their original allocation for every full vesting period since
//! their last claim; missed periods accumulate. Claiming only opens once the
//! crowdsale address has been recorded.

pub mod allocation;
pub mod distributor;
pub mod errors;
pub mod events;
pub mod vesting;

pub use allocation::{AllocationBook, AllocationRecord};
pub use distributor::Airdrop;
pub use errors::{AirdropError, Result};
pub use events::AirdropEvent;
pub use vesting::{Release, VestingSettings, DEFAULT_VESTING_PERIOD};
