use serde::{Deserialize, Serialize};
use tranche_primitives::{Address, Amount, LedgerPosition, Role};

/// Emitted once per successful airdrop mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AirdropEvent {
    Initialized {
        fundkeeper: Address,
        funded: Amount,
    },
    BalanceAdded {
        account: Address,
        amount: Amount,
    },
    BalanceSubtracted {
        account: Address,
        amount: Amount,
    },
    Claimed {
        account: Address,
        amount: Amount,
        periods: u64,
        next_claim_position: LedgerPosition,
    },
    CrowdsaleSet {
        crowdsale: Address,
    },
    Ended,
    Recovered {
        token: Address,
        to: Address,
        amount: Amount,
    },
    RoleGranted {
        account: Address,
        role: Role,
    },
}
