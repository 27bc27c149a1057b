#![allow(dead_code)]

use std::sync::Arc;
use tranche_crowdsale::*;
use tranche_primitives::{units, Address, Amount, ManualClock};
use tranche_token::{InMemoryTokenLedger, TokenLedger};

pub const START: u64 = 1_000;
pub const INTERVALS: u64 = 10;
pub const CAP_SECRET: u128 = 0x5eed;

pub struct Harness {
    pub clock: ManualClock,
    pub token: InMemoryTokenLedger,
    pub sale: Crowdsale,
    pub owner: Address,
}

impl Harness {
    pub fn advance_intervals(&self, intervals: u64) {
        self.clock.advance(intervals * DEFAULT_INTERVAL_LENGTH);
    }

    pub fn balance(&self, account: &Address) -> Amount {
        self.token.balance_of(account)
    }

    pub fn claim(&mut self, account: &Address, interval: u64) -> Result<ClaimReceipt> {
        self.sale.claim(account, &mut self.token, interval)
    }

    pub fn claim_all(&mut self, account: &Address) -> Result<ClaimAllReceipt> {
        self.sale.claim_all(account, &mut self.token)
    }
}

/// 10 intervals of 1 000 tokens; interval 0 targets 10 native units at
/// a reference price of 100.
pub fn params() -> SaleParams {
    SaleParams {
        eth_price: units(100),
        floor: units(1) / 10,
        reserve_start: units(1),
        ceiling: units(10),
        allocation: units(10_000),
    }
}

pub fn deploy(guaranteed: u64, cap: Amount, policy: WhitelistPolicy) -> Harness {
    let owner = Address::derive("owner");
    let token_address = Address::derive("token");
    let sale_address = Address::derive("crowdsale");
    let clock = ManualClock::new(START);
    let token = InMemoryTokenLedger::new(token_address, "TRN", owner, units(1_000_000));

    let config = SaleConfig {
        token: token_address,
        number_of_intervals: INTERVALS,
        guaranteed_intervals: guaranteed,
        hidden_cap: HiddenCap::seal(cap, CAP_SECRET).expect("valid cap"),
    };
    let settings = SaleSettings {
        whitelist_policy: policy,
        ..SaleSettings::default()
    };
    let sale = Crowdsale::new(sale_address, owner, config, settings, Arc::new(clock.clone()))
        .expect("valid sale");

    Harness {
        clock,
        token,
        sale,
        owner,
    }
}

/// Deployed, funded and initialized with no whitelist window.
pub fn open_sale(cap: Amount) -> Harness {
    let mut h = deploy(0, cap, WhitelistPolicy::GuaranteedWindow);
    initialize(&mut h);
    h
}

pub fn initialize(h: &mut Harness) {
    let sale_address = h.sale.address();
    h.token
        .approve(&h.owner, &sale_address, params().allocation)
        .expect("approve");
    h.sale
        .initialize(&h.owner, &mut h.token, params())
        .expect("initialize");
}
