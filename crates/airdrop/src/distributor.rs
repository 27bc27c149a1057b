//! Airdrop contract instance
//!
//! `Deployed` (`Stage::Created`) until a Manager who is also the Fundkeeper
//! funds it, `Active` while Managers allocate and holders claim, `Ended` once
//! a Manager closes it; a Recoverer may then sweep what is left.

use crate::allocation::{AllocationBook, AllocationRecord};
use crate::errors::{AirdropError, Result};
use crate::events::AirdropEvent;
use crate::vesting::{Release, VestingSettings};
use std::sync::Arc;
use tracing::{debug, info};
use tranche_primitives::{Address, Amount, LedgerClock, LedgerPosition, Role, Roles, Stage};
use tranche_token::TokenLedger;

pub struct Airdrop {
    address: Address,
    token: Address,
    settings: VestingSettings,
    clock: Arc<dyn LedgerClock>,
    roles: Roles,
    stage: Stage,
    crowdsale: Option<Address>,
    book: AllocationBook,
    events: Vec<AirdropEvent>,
}

impl Airdrop {
    pub fn new(
        address: Address,
        deployer: Address,
        token: Address,
        settings: VestingSettings,
        clock: Arc<dyn LedgerClock>,
    ) -> Result<Self> {
        if address.is_zero() || deployer.is_zero() || token.is_zero() {
            return Err(AirdropError::ZeroAddress);
        }
        settings.validate()?;
        info!(target: "airdrop", airdrop = %address, %token, period = settings.period, "Airdrop deployed");
        Ok(Self {
            address,
            token,
            settings,
            clock,
            roles: Roles::with_deployer(deployer),
            stage: Stage::Created,
            crowdsale: None,
            book: AllocationBook::new(),
            events: Vec::new(),
        })
    }

    /// Manager-only: pull `amount` from `fundkeeper` into the distributor
    /// and open it. The fundkeeper must hold the role and have approved the
    /// distributor for at least `amount`.
    pub fn initialize(
        &mut self,
        caller: &Address,
        fundkeeper: &Address,
        token: &mut dyn TokenLedger,
        amount: Amount,
    ) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.roles.require(fundkeeper, Role::Fundkeeper)?;
        self.require_stage(Stage::Created)?;
        self.require_token(token)?;
        if amount == 0 {
            return Err(AirdropError::ZeroAmount(*fundkeeper));
        }

        let mut book = self.book.clone();
        book.fund(amount)?;
        token.transfer_from(&self.address, fundkeeper, &self.address, amount)?;
        self.book = book;
        self.advance(Stage::Active);

        info!(target: "airdrop", manager = %caller, %fundkeeper, funded = amount, "Airdrop initialized");
        self.events.push(AirdropEvent::Initialized {
            fundkeeper: *fundkeeper,
            funded: amount,
        });
        Ok(())
    }

    /// Alias of [`Airdrop::initialize`] under its legacy misspelled name.
    pub fn initilize(
        &mut self,
        caller: &Address,
        fundkeeper: &Address,
        token: &mut dyn TokenLedger,
        amount: Amount,
    ) -> Result<()> {
        self.initialize(caller, fundkeeper, token, amount)
    }

    /// Manager-only: allocate `amounts[i]` to `accounts[i]` from the pool.
    pub fn add_balance(
        &mut self,
        caller: &Address,
        accounts: &[Address],
        amounts: &[Amount],
    ) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.require_stage(Stage::Active)?;
        validate_batch(accounts, amounts)?;

        let now = self.position();
        let mut book = self.book.clone();
        for (account, amount) in accounts.iter().zip(amounts) {
            book.allocate(*account, *amount, now)?;
        }
        self.book = book;

        for (account, amount) in accounts.iter().zip(amounts) {
            debug!(target: "airdrop", %account, amount, "Balance added");
            self.events.push(AirdropEvent::BalanceAdded {
                account: *account,
                amount: *amount,
            });
        }
        info!(
            target: "airdrop",
            accounts = accounts.len(),
            unallocated = self.book.unallocated(),
            "Allocations added"
        );
        Ok(())
    }

    /// Manager-only: return `amounts[i]` of `accounts[i]`'s balance to the pool.
    pub fn sub_balance(
        &mut self,
        caller: &Address,
        accounts: &[Address],
        amounts: &[Amount],
    ) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.require_stage(Stage::Active)?;
        validate_batch(accounts, amounts)?;

        let mut book = self.book.clone();
        for (account, amount) in accounts.iter().zip(amounts) {
            book.deallocate(*account, *amount)?;
        }
        self.book = book;

        for (account, amount) in accounts.iter().zip(amounts) {
            debug!(target: "airdrop", %account, amount, "Balance subtracted");
            self.events.push(AirdropEvent::BalanceSubtracted {
                account: *account,
                amount: *amount,
            });
        }
        info!(
            target: "airdrop",
            accounts = accounts.len(),
            unallocated = self.book.unallocated(),
            "Allocations reduced"
        );
        Ok(())
    }

    /// Release every full vesting period elapsed since the caller's last claim.
    pub fn claim(&mut self, caller: &Address, token: &mut dyn TokenLedger) -> Result<Amount> {
        self.require_stage(Stage::Active)?;
        let record = self
            .book
            .record(caller)
            .filter(|r| !r.is_closed())
            .copied()
            .ok_or(AirdropError::NothingAllocated(*caller))?;
        if self.crowdsale.is_none() {
            return Err(AirdropError::CrowdsaleNotSet);
        }
        let release = self
            .release_for(&record)
            .ok_or(AirdropError::NotVested {
                next_release: self
                    .settings
                    .next_release_position(record.last_claim_position),
            })?;
        self.require_token(token)?;

        token.transfer(&self.address, caller, release.amount)?;
        self.book.settle(caller, &release)?;

        info!(
            target: "airdrop",
            account = %caller,
            amount = release.amount,
            periods = release.periods,
            remaining = self.book.balance_of(caller),
            "Claimed"
        );
        self.events.push(AirdropEvent::Claimed {
            account: *caller,
            amount: release.amount,
            periods: release.periods,
            next_claim_position: release.next_claim_position,
        });
        Ok(release.amount)
    }

    /// Manager-only, before the end: record the crowdsale whose existence
    /// enables claiming.
    pub fn set_crowdsale(&mut self, caller: &Address, crowdsale: Address) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.require_not_ended()?;
        if crowdsale.is_zero() {
            return Err(AirdropError::ZeroAddress);
        }
        self.crowdsale = Some(crowdsale);
        info!(target: "airdrop", %crowdsale, "Crowdsale set");
        self.events.push(AirdropEvent::CrowdsaleSet { crowdsale });
        Ok(())
    }

    /// Manager-only: close the airdrop; claims are rejected afterwards.
    pub fn airdrop_end(&mut self, caller: &Address) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.require_stage(Stage::Active)?;
        self.advance(Stage::Ended);
        info!(
            target: "airdrop",
            outstanding = self.book.outstanding(),
            unallocated = self.book.unallocated(),
            "Airdrop ended"
        );
        self.events.push(AirdropEvent::Ended);
        Ok(())
    }

    /// Recoverer-only, after the end: sweep the distributor's whole balance
    /// of `token` to the caller.
    pub fn recover_tokens(&mut self, caller: &Address, token: &mut dyn TokenLedger) -> Result<Amount> {
        self.roles.require(caller, Role::Recoverer)?;
        self.require_stage(Stage::Ended)?;
        let amount = token.balance_of(&self.address);
        token.transfer(&self.address, caller, amount)?;

        info!(target: "airdrop", token = %token.address(), to = %caller, amount, "Tokens recovered");
        self.events.push(AirdropEvent::Recovered {
            token: token.address(),
            to: *caller,
            amount,
        });
        Ok(amount)
    }

    pub fn add_manager(&mut self, caller: &Address, account: Address) -> Result<()> {
        self.grant(caller, account, Role::Manager)
    }

    pub fn add_recoverer(&mut self, caller: &Address, account: Address) -> Result<()> {
        self.grant(caller, account, Role::Recoverer)
    }

    pub fn add_fundkeeper(&mut self, caller: &Address, account: Address) -> Result<()> {
        self.grant(caller, account, Role::Fundkeeper)
    }

    fn grant(&mut self, caller: &Address, account: Address, role: Role) -> Result<()> {
        self.roles.grant(caller, account, role)?;
        self.events.push(AirdropEvent::RoleGranted { account, role });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn settings(&self) -> &VestingSettings {
        &self.settings
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn crowdsale(&self) -> Option<Address> {
        self.crowdsale
    }

    /// Original allocation of `account` (the release basis).
    pub fn allocation_of(&self, account: &Address) -> Amount {
        self.book.record(account).map_or(0, |r| r.original_allocation)
    }

    /// Balance still to be released to `account`.
    pub fn airdrop_balance_of(&self, account: &Address) -> Amount {
        self.book.balance_of(account)
    }

    pub fn claim_position_of(&self, account: &Address) -> Option<LedgerPosition> {
        self.book.record(account).map(|r| r.last_claim_position)
    }

    pub fn claimed_total_of(&self, account: &Address) -> Amount {
        self.book.record(account).map_or(0, |r| r.claimed_total)
    }

    /// Amount a claim would release right now.
    pub fn claimable(&self, account: &Address) -> Amount {
        self.book
            .record(account)
            .and_then(|r| self.release_for(r))
            .map_or(0, |release| release.amount)
    }

    /// Unallocated pool.
    pub fn total_supply(&self) -> Amount {
        self.book.unallocated()
    }

    /// Net amount handed to accounts through `add_balance`/`sub_balance`.
    pub fn distributed_total(&self) -> Amount {
        self.book.distributed()
    }

    /// Amount pulled in by `initialize`.
    pub fn funded_allocation(&self) -> Amount {
        self.book.funded()
    }

    /// Σ remaining balances across all accounts.
    pub fn outstanding(&self) -> Amount {
        self.book.outstanding()
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.roles.has(account, role)
    }

    pub fn events(&self) -> &[AirdropEvent] {
        &self.events
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn position(&self) -> LedgerPosition {
        self.clock.position()
    }

    fn release_for(&self, record: &AllocationRecord) -> Option<Release> {
        self.settings.release(
            record.original_allocation,
            record.allocated_balance,
            record.last_claim_position,
            self.position(),
        )
    }

    fn require_stage(&self, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(AirdropError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    fn require_not_ended(&self) -> Result<()> {
        if self.stage == Stage::Ended {
            return Err(AirdropError::WrongStage {
                expected: Stage::Active,
                actual: Stage::Ended,
            });
        }
        Ok(())
    }

    fn require_token(&self, token: &dyn TokenLedger) -> Result<()> {
        if token.address() != self.token {
            return Err(AirdropError::TokenMismatch {
                expected: self.token,
                actual: token.address(),
            });
        }
        Ok(())
    }

    fn advance(&mut self, next: Stage) {
        if self.stage.can_advance_to(next) {
            debug!(target: "airdrop", from = %self.stage, to = %next, "Stage advanced");
            self.stage = next;
        }
    }
}

fn validate_batch(accounts: &[Address], amounts: &[Amount]) -> Result<()> {
    if accounts.len() != amounts.len() {
        return Err(AirdropError::LengthMismatch {
            accounts: accounts.len(),
            amounts: amounts.len(),
        });
    }
    if accounts.is_empty() {
        return Err(AirdropError::EmptyBatch);
    }
    for (account, amount) in accounts.iter().zip(amounts) {
        if account.is_zero() {
            return Err(AirdropError::ZeroAddress);
        }
        if *amount == 0 {
            return Err(AirdropError::ZeroAmount(*account));
        }
    }
    Ok(())
}
