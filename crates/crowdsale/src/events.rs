use serde::{Deserialize, Serialize};
use tranche_primitives::{Address, Amount, LedgerPosition, Role};

/// Emitted once per successful crowdsale mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SaleEvent {
    Initialized {
        start_position: LedgerPosition,
        end_position: LedgerPosition,
        allocation: Amount,
        tokens_per_interval: Amount,
    },
    Whitelisted {
        account: Address,
    },
    Participated {
        account: Address,
        interval: u64,
        value: Amount,
        interval_total: Amount,
    },
    Claimed {
        account: Address,
        interval: u64,
        tokens: Amount,
    },
    ClaimedAll {
        account: Address,
        intervals: Vec<u64>,
        tokens: Amount,
    },
    Rebased {
        interval: u64,
        eth_price: Amount,
    },
    Collected {
        to: Address,
        amount: Amount,
    },
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
