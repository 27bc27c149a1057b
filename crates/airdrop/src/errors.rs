use thiserror::Error;
use tranche_primitives::{Address, Amount, ConfigError, ErrorKind, LedgerPosition, RoleError, Stage};
use tranche_token::TokenError;

#[derive(Debug, Error)]
pub enum AirdropError {
    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error("operation requires the airdrop to be {expected}, but it is {actual}")]
    WrongStage { expected: Stage, actual: Stage },

    #[error("address must not be zero")]
    ZeroAddress,

    #[error("amount for {0} must be greater than zero")]
    ZeroAmount(Address),

    #[error("{accounts} accounts but {amounts} amounts")]
    LengthMismatch { accounts: usize, amounts: usize },

    #[error("batch must name at least one account")]
    EmptyBatch,

    #[error("unallocated pool holds {available}, cannot allocate {requested}")]
    InsufficientPool { available: Amount, requested: Amount },

    #[error("allocation of {0} is closed and cannot be re-opened")]
    RecordClosed(Address),

    #[error("{account} has {available} allocated, cannot remove {requested}")]
    InsufficientAllocation {
        account: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("{0} has no remaining allocation")]
    NothingAllocated(Address),

    #[error("crowdsale address has not been set")]
    CrowdsaleNotSet,

    #[error("no vesting period elapsed; next release at position {next_release}")]
    NotVested { next_release: LedgerPosition },

    #[error("token {actual} is not the airdrop token {expected}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}

impl AirdropError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AirdropError::Settings(_) | AirdropError::TokenMismatch { .. } => {
                ErrorKind::Configuration
            }
            AirdropError::Role(RoleError::ZeroAddress) => ErrorKind::Validation,
            AirdropError::Role(_) => ErrorKind::Authorization,
            AirdropError::WrongStage { .. }
            | AirdropError::InsufficientPool { .. }
            | AirdropError::RecordClosed(_)
            | AirdropError::CrowdsaleNotSet
            | AirdropError::NotVested { .. } => ErrorKind::State,
            AirdropError::ZeroAddress
            | AirdropError::ZeroAmount(_)
            | AirdropError::LengthMismatch { .. }
            | AirdropError::EmptyBatch
            | AirdropError::InsufficientAllocation { .. } => ErrorKind::Validation,
            AirdropError::NothingAllocated(_) => ErrorKind::DuplicateClaim,
            AirdropError::Token(err) => err.kind(),
            AirdropError::Overflow(_) => ErrorKind::Arithmetic,
        }
    }
}

pub type Result<T> = std::result::Result<T, AirdropError>;
