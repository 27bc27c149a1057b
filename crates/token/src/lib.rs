//! Tranche token collaborator
//!
//! The distribution ledgers treat the token as an external contract with
//! standard balance/allowance semantics. This crate defines that seam and a
//! fixed-supply in-memory implementation for simulation and tests.

pub mod ledger;

pub use ledger::{InMemoryTokenLedger, MockTokenLedger, TokenError, TokenLedger};
