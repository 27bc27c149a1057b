//! Tranche primitives
//!
//! Shared building blocks for the crowdsale and airdrop ledgers:
//! - Account addresses and 18-decimal amounts with wide `mul_div`
//! - Injectable ledger clock (positions, not wall-clock time)
//! - Role capability sets and forward-only lifecycle stages
//! - Error taxonomy and TOML settings helpers

pub mod address;
pub mod amount;
pub mod clock;
pub mod config;
pub mod error;
pub mod roles;
pub mod stage;

pub use address::*;
pub use amount::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use roles::*;
pub use stage::*;
