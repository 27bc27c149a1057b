use thiserror::Error;
use tranche_primitives::{Address, Amount, ConfigError, ErrorKind, RoleError, Stage};
use tranche_token::TokenError;

/// Errors raised by crowdsale operations. Every failure aborts the operation
/// before any state or token balance changes.
#[derive(Debug, Error)]
pub enum CrowdsaleError {
    #[error("invalid sale configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error("account {account} is not whitelisted for interval {interval}")]
    NotWhitelisted { account: Address, interval: u64 },

    #[error("operation requires the sale to be {expected}, but it is {actual}")]
    WrongStage { expected: Stage, actual: Stage },

    #[error("interval {interval} is outside the sale ({number_of_intervals} intervals)")]
    IntervalOutOfRange { interval: u64, number_of_intervals: u64 },

    #[error("interval {0} has not been settled yet")]
    IntervalNotSettled(u64),

    #[error("contribution of {value} would exceed the committed cap")]
    CapExceeded { value: Amount },

    #[error("the committed cap has not been reached")]
    CapNotReached,

    #[error("contribution must be greater than zero")]
    ZeroContribution,

    #[error("address must not be zero")]
    ZeroAddress,

    #[error("account {account} has no contribution in interval {interval}")]
    NoContribution { account: Address, interval: u64 },

    #[error("account {account} already claimed interval {interval}")]
    AlreadyClaimed { account: Address, interval: u64 },

    #[error("account {0} has nothing left to claim")]
    NothingToClaim(Address),

    #[error("token rate {rate} is below the caller's limit {limit}")]
    Slippage { rate: Amount, limit: Amount },

    #[error("token {actual} is not the sale token {expected}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}

impl CrowdsaleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrowdsaleError::InvalidConfig(_)
            | CrowdsaleError::Settings(_)
            | CrowdsaleError::TokenMismatch { .. } => ErrorKind::Configuration,
            CrowdsaleError::Role(RoleError::ZeroAddress) => ErrorKind::Validation,
            CrowdsaleError::Role(_) | CrowdsaleError::NotWhitelisted { .. } => {
                ErrorKind::Authorization
            }
            CrowdsaleError::WrongStage { .. }
            | CrowdsaleError::IntervalOutOfRange { .. }
            | CrowdsaleError::IntervalNotSettled(_)
            | CrowdsaleError::CapExceeded { .. }
            | CrowdsaleError::CapNotReached => ErrorKind::State,
            CrowdsaleError::ZeroContribution
            | CrowdsaleError::ZeroAddress
            | CrowdsaleError::NoContribution { .. } => ErrorKind::Validation,
            CrowdsaleError::AlreadyClaimed { .. } | CrowdsaleError::NothingToClaim(_) => {
                ErrorKind::DuplicateClaim
            }
            CrowdsaleError::Slippage { .. } => ErrorKind::Slippage,
            CrowdsaleError::Token(err) => err.kind(),
            CrowdsaleError::Overflow(_) => ErrorKind::Arithmetic,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrowdsaleError>;
