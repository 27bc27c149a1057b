use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification shared by every error the distribution ledgers return.
///
/// Contract-specific error enums keep their detailed variants and expose the
/// category through a `kind()` method, so callers can react to the class of
/// failure without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Invalid construction or initialization parameters.
    Configuration,
    /// Caller lacks a role or whitelist membership.
    Authorization,
    /// Operation attempted outside its required stage or interval.
    State,
    /// Already claimed, or nothing left to claim.
    DuplicateClaim,
    /// Computed price is worse than the caller's limit.
    Slippage,
    /// Malformed arguments: zero address, zero amount, mismatched batches.
    Validation,
    /// The token collaborator refused a balance movement.
    Token,
    /// Checked arithmetic overflowed.
    Arithmetic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authorization => "authorization",
            ErrorKind::State => "state",
            ErrorKind::DuplicateClaim => "duplicate-claim",
            ErrorKind::Slippage => "slippage",
            ErrorKind::Validation => "validation",
            ErrorKind::Token => "token",
            ErrorKind::Arithmetic => "arithmetic",
        };
        f.write_str(name)
    }
}
