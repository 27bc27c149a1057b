//! Crowdsale contract instance
//!
//! Ties the scheduler, reserve adjuster, whitelist, hidden cap and
//! participation book together behind role-gated operations. Each operation
//! reads the ledger position once, validates everything, and only then
//! mutates; a rejected operation leaves no trace.
//!
//! ## Stage
//! - `Created` until `initialize` succeeds
//! - `Active` while the position is inside the sale window and the hidden cap
//!   has not been reached
//! - `Ended` afterwards; derived from the position and totals, never stored

use crate::claim::{entitlement, token_rate, ClaimAllReceipt, ClaimReceipt};
use crate::errors::{CrowdsaleError, Result};
use crate::events::SaleEvent;
use crate::hidden_cap::CapDigest;
use crate::params::{SaleConfig, SaleParams};
use crate::participation::ParticipationLedger;
use crate::reserve::{IntervalParams, ReserveAdjuster};
use crate::scheduler::IntervalScheduler;
use crate::settings::SaleSettings;
use crate::whitelist::Whitelist;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tranche_primitives::{Address, Amount, LedgerClock, LedgerPosition, Role, Roles, Stage};
use tranche_token::TokenLedger;

/// State that only exists once the sale has been initialized.
#[derive(Debug, Clone)]
struct RunningSale {
    scheduler: IntervalScheduler,
    adjuster: ReserveAdjuster,
    allocation: Amount,
}

pub struct Crowdsale {
    address: Address,
    config: SaleConfig,
    settings: SaleSettings,
    clock: Arc<dyn LedgerClock>,
    roles: Roles,
    whitelist: Whitelist,
    participation: ParticipationLedger,
    running: Option<RunningSale>,
    uncollected: Amount,
    events: Vec<SaleEvent>,
}

impl Crowdsale {
    pub fn new(
        address: Address,
        deployer: Address,
        config: SaleConfig,
        settings: SaleSettings,
        clock: Arc<dyn LedgerClock>,
    ) -> Result<Self> {
        if address.is_zero() || deployer.is_zero() {
            return Err(CrowdsaleError::ZeroAddress);
        }
        config.validate()?;
        settings.validate()?;
        let whitelist = Whitelist::new(config.guaranteed_intervals, settings.whitelist_policy);
        info!(
            target: "crowdsale",
            sale = %address,
            token = %config.token,
            intervals = config.number_of_intervals,
            guaranteed = config.guaranteed_intervals,
            cap_digest = %config.hidden_cap.digest(),
            "Crowdsale deployed"
        );
        Ok(Self {
            address,
            config,
            settings,
            clock,
            roles: Roles::with_deployer(deployer),
            whitelist,
            participation: ParticipationLedger::new(),
            running: None,
            uncollected: 0,
            events: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Manager-only: validate the pricing inputs, pull the allocation from
    /// the caller and open interval 0 at the current position.
    pub fn initialize(
        &mut self,
        caller: &Address,
        token: &mut dyn TokenLedger,
        params: SaleParams,
    ) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.require_stage(Stage::Created)?;
        self.require_token(token)?;

        let n = self.config.number_of_intervals;
        params.validate(n)?;
        let tokens_per_interval = params.tokens_per_interval(n);
        let adjuster = ReserveAdjuster::genesis(
            self.settings.bands,
            params.floor,
            params.ceiling,
            params.reserve_start,
            params.eth_price,
            tokens_per_interval,
        )?;
        let scheduler = IntervalScheduler::new(self.position(), self.settings.interval_length, n);

        token.transfer_from(&self.address, caller, &self.address, params.allocation)?;

        info!(
            target: "crowdsale",
            start = scheduler.start_position(),
            end = scheduler.end_position(),
            allocation = params.allocation,
            tokens_per_interval,
            "Crowdsale initialized"
        );
        self.events.push(SaleEvent::Initialized {
            start_position: scheduler.start_position(),
            end_position: scheduler.end_position(),
            allocation: params.allocation,
            tokens_per_interval,
        });
        self.running = Some(RunningSale {
            scheduler,
            adjuster,
            allocation: params.allocation,
        });
        Ok(())
    }

    /// Manager-only, before the end: add accounts to the guaranteed-window
    /// allow-list.
    pub fn add_to_whitelist(&mut self, caller: &Address, accounts: &[Address]) -> Result<usize> {
        self.roles.require(caller, Role::Manager)?;
        let stage = self.stage();
        if stage == Stage::Ended {
            return Err(CrowdsaleError::WrongStage {
                expected: Stage::Active,
                actual: stage,
            });
        }
        let added = self.whitelist.add_all(accounts)?;
        for account in &added {
            debug!(target: "crowdsale", %account, "Whitelisted");
            self.events.push(SaleEvent::Whitelisted { account: *account });
        }
        Ok(added.len())
    }

    // -------------------------------------------------------------------------
    // Participation
    // -------------------------------------------------------------------------

    /// Contribute `value` native units to the current interval.
    ///
    /// `price_limit` is the minimum acceptable token rate (token base units
    /// per whole native unit); zero disables the check.
    pub fn participate(
        &mut self,
        caller: &Address,
        price_limit: Amount,
        value: Amount,
    ) -> Result<u64> {
        self.require_stage(Stage::Active)?;
        let run = self.running()?;
        if value == 0 {
            return Err(CrowdsaleError::ZeroContribution);
        }
        let interval = run.scheduler.interval_at(self.position());
        self.require_in_sale(interval)?;
        if !self.whitelist.admits(caller, interval) {
            return Err(CrowdsaleError::NotWhitelisted {
                account: *caller,
                interval,
            });
        }

        let cap = self.config.hidden_cap.enforced_cap()?;
        let cumulative = self
            .participation
            .cumulative()
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow("cumulative proceeds"))?;
        if cumulative > cap {
            warn!(target: "crowdsale", account = %caller, value, "Contribution exceeds hidden cap");
            return Err(CrowdsaleError::CapExceeded { value });
        }

        let params = run
            .adjuster
            .preview(interval, |i| self.participation.total(i))?;
        if price_limit > 0 {
            let projected = self
                .participation
                .total(interval)
                .checked_add(value)
                .ok_or(CrowdsaleError::Overflow("interval total"))?;
            let rate = token_rate(
                run.adjuster.tokens_per_interval(),
                params.reserve_amount,
                projected,
            )?;
            if rate < price_limit {
                warn!(
                    target: "crowdsale",
                    account = %caller,
                    interval,
                    rate,
                    limit = price_limit,
                    "Contribution rejected by price limit"
                );
                return Err(CrowdsaleError::Slippage {
                    rate,
                    limit: price_limit,
                });
            }
        }
        let uncollected = self
            .uncollected
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow("uncollected proceeds"))?;

        self.sync_intervals(interval)?;
        let interval_total = self.participation.contribute(interval, *caller, value)?;
        self.uncollected = uncollected;

        info!(
            target: "crowdsale",
            account = %caller,
            interval,
            value,
            interval_total,
            "Participated"
        );
        if self.config.hidden_cap.is_reached(cumulative) {
            info!(target: "crowdsale", cumulative, "Hidden cap reached, sale ended");
        }
        self.events.push(SaleEvent::Participated {
            account: *caller,
            interval,
            value,
            interval_total,
        });
        Ok(interval)
    }

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------

    /// Settle the caller's contribution to one closed interval.
    pub fn claim(
        &mut self,
        caller: &Address,
        token: &mut dyn TokenLedger,
        interval: u64,
    ) -> Result<ClaimReceipt> {
        let run = self.running()?;
        self.require_in_sale(interval)?;
        if interval >= self.settled_bound(run) {
            return Err(CrowdsaleError::IntervalNotSettled(interval));
        }
        let record = self
            .participation
            .record(interval, caller)
            .filter(|r| r.contributed > 0)
            .ok_or(CrowdsaleError::NoContribution {
                account: *caller,
                interval,
            })?;
        if record.claimed {
            return Err(CrowdsaleError::AlreadyClaimed {
                account: *caller,
                interval,
            });
        }
        self.require_token(token)?;

        let params = run
            .adjuster
            .preview(interval, |i| self.participation.total(i))?;
        let tokens = entitlement(
            record.contributed,
            run.adjuster.tokens_per_interval(),
            self.participation.total(interval),
            params.reserve_amount,
        )?;

        self.sync_intervals(interval)?;
        token.transfer(&self.address, caller, tokens)?;
        self.participation.mark_claimed(interval, caller)?;

        info!(target: "crowdsale", account = %caller, interval, tokens, "Claimed");
        self.events.push(SaleEvent::Claimed {
            account: *caller,
            interval,
            tokens,
        });
        Ok(ClaimReceipt {
            account: *caller,
            interval,
            contribution: record.contributed,
            tokens,
        })
    }

    /// Settle every closed interval the caller still has a claim on, in a
    /// single transfer. Either every interval is settled or none is.
    pub fn claim_all(
        &mut self,
        caller: &Address,
        token: &mut dyn TokenLedger,
    ) -> Result<ClaimAllReceipt> {
        let run = self.running()?;
        let pending = self.participation.unclaimed(caller, self.settled_bound(run));
        let Some(&(upto, _)) = pending.last() else {
            return Err(CrowdsaleError::NothingToClaim(*caller));
        };
        self.require_token(token)?;

        let params = run
            .adjuster
            .params_through(upto, |i| self.participation.total(i))?;
        let tokens_per_interval = run.adjuster.tokens_per_interval();
        let mut settled = Vec::with_capacity(pending.len());
        let mut total: Amount = 0;
        for (interval, contribution) in pending {
            let reserve_amount = usize::try_from(interval)
                .ok()
                .and_then(|i| params.get(i))
                .map(|p| p.reserve_amount)
                .ok_or(CrowdsaleError::Overflow("interval index"))?;
            let tokens = entitlement(
                contribution,
                tokens_per_interval,
                self.participation.total(interval),
                reserve_amount,
            )?;
            total = total
                .checked_add(tokens)
                .ok_or(CrowdsaleError::Overflow("claim total"))?;
            settled.push(ClaimReceipt {
                account: *caller,
                interval,
                contribution,
                tokens,
            });
        }

        self.sync_intervals(upto)?;
        token.transfer(&self.address, caller, total)?;
        for receipt in &settled {
            self.participation.mark_claimed(receipt.interval, caller)?;
            debug!(
                target: "crowdsale",
                account = %caller,
                interval = receipt.interval,
                tokens = receipt.tokens,
                "Interval settled"
            );
        }

        let intervals: Vec<u64> = settled.iter().map(|r| r.interval).collect();
        info!(
            target: "crowdsale",
            account = %caller,
            intervals = intervals.len(),
            tokens = total,
            "Claimed all settled intervals"
        );
        self.events.push(SaleEvent::ClaimedAll {
            account: *caller,
            intervals,
            tokens: total,
        });
        Ok(ClaimAllReceipt {
            account: *caller,
            settled,
            tokens: total,
        })
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    /// Manager-only: fix the current interval's parameters, then switch the
    /// reference price used for every interval derived afterwards.
    pub fn set_rebase(&mut self, caller: &Address, eth_price: Amount) -> Result<()> {
        self.roles.require(caller, Role::Manager)?;
        self.require_stage(Stage::Active)?;
        let run = self.running()?;
        if eth_price < run.adjuster.ceiling() {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "reference price {eth_price} is below the ceiling {}",
                run.adjuster.ceiling()
            )));
        }
        let interval = run.scheduler.interval_at(self.position());

        self.sync_intervals(interval)?;
        if let Some(run) = self.running.as_mut() {
            run.adjuster.rebase(eth_price)?;
        }

        info!(target: "crowdsale", interval, eth_price, "Reference price rebased");
        self.events.push(SaleEvent::Rebased { interval, eth_price });
        Ok(())
    }

    /// Check a revealed `(cap, secret)` pair. Returns `false` when it does not
    /// match the commitment and fails while proceeds are still below the cap.
    pub fn reveal_cap(&self, cap: Amount, secret: u128) -> Result<bool> {
        if !self.config.hidden_cap.verify(cap, secret) {
            return Ok(false);
        }
        if !self.config.hidden_cap.is_reached(self.participation.cumulative()) {
            return Err(CrowdsaleError::CapNotReached);
        }
        Ok(true)
    }

    /// Fundkeeper-only: hand over the native proceeds collected so far.
    pub fn collect(&mut self, caller: &Address) -> Result<Amount> {
        self.roles.require(caller, Role::Fundkeeper)?;
        let amount = std::mem::take(&mut self.uncollected);
        info!(target: "crowdsale", to = %caller, amount, "Proceeds collected");
        self.events.push(SaleEvent::Collected {
            to: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Recoverer-only, once the sale has ended: sweep this contract's whole
    /// balance of `token` to the caller.
    pub fn recover_tokens(&mut self, caller: &Address, token: &mut dyn TokenLedger) -> Result<Amount> {
        self.roles.require(caller, Role::Recoverer)?;
        self.require_stage(Stage::Ended)?;
        let amount = token.balance_of(&self.address);
        token.transfer(&self.address, caller, amount)?;

        info!(
            target: "crowdsale",
            token = %token.address(),
            to = %caller,
            amount,
            "Tokens recovered"
        );
        self.events.push(SaleEvent::Recovered {
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
        self.events.push(SaleEvent::RoleGranted { account, role });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.config.token
    }

    pub fn number_of_intervals(&self) -> u64 {
        self.config.number_of_intervals
    }

    pub fn guaranteed_intervals(&self) -> u64 {
        self.config.guaranteed_intervals
    }

    pub fn settings(&self) -> &SaleSettings {
        &self.settings
    }

    pub fn stage(&self) -> Stage {
        match &self.running {
            None => Stage::Created,
            Some(run) => {
                let closed = run.scheduler.is_closed(self.position());
                if closed || self.config.hidden_cap.is_reached(self.participation.cumulative()) {
                    Stage::Ended
                } else {
                    Stage::Active
                }
            }
        }
    }

    /// Interval the current ledger position falls in; `None` before
    /// initialization. May be `>= number_of_intervals` once the window closed.
    pub fn current_interval(&self) -> Option<u64> {
        self.running
            .as_ref()
            .map(|run| run.scheduler.interval_at(self.position()))
    }

    /// Parameters of `index`: memoized, or previewed when the interval has
    /// already started but no operation has touched it yet.
    pub fn interval_params(&self, index: u64) -> Option<IntervalParams> {
        let run = self.running.as_ref()?;
        if let Some(params) = run.adjuster.get(index) {
            return Some(*params);
        }
        let current = run.scheduler.interval_at(self.position());
        if index > current || index >= self.config.number_of_intervals {
            return None;
        }
        run.adjuster
            .preview(index, |i| self.participation.total(i))
            .ok()
    }

    /// Number of intervals whose parameters are fixed.
    pub fn materialized_intervals(&self) -> u64 {
        self.running
            .as_ref()
            .map_or(0, |run| run.adjuster.materialized())
    }

    pub fn interval_total(&self, interval: u64) -> Amount {
        self.participation.total(interval)
    }

    pub fn contribution_of(&self, interval: u64, account: &Address) -> Amount {
        self.participation.contribution(interval, account)
    }

    pub fn is_claimed(&self, interval: u64, account: &Address) -> bool {
        self.participation.is_claimed(interval, account)
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.whitelist.contains(account)
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.roles.has(account, role)
    }

    pub fn tokens_per_interval(&self) -> Option<Amount> {
        self.running
            .as_ref()
            .map(|run| run.adjuster.tokens_per_interval())
    }

    pub fn allocation(&self) -> Option<Amount> {
        self.running.as_ref().map(|run| run.allocation)
    }

    pub fn start_position(&self) -> Option<LedgerPosition> {
        self.running
            .as_ref()
            .map(|run| run.scheduler.start_position())
    }

    pub fn end_position(&self) -> Option<LedgerPosition> {
        self.running.as_ref().map(|run| run.scheduler.end_position())
    }

    pub fn eth_price(&self) -> Option<Amount> {
        self.running.as_ref().map(|run| run.adjuster.eth_price())
    }

    pub fn cumulative_raised(&self) -> Amount {
        self.participation.cumulative()
    }

    pub fn uncollected_proceeds(&self) -> Amount {
        self.uncollected
    }

    pub fn cap_digest(&self) -> CapDigest {
        self.config.hidden_cap.digest()
    }

    pub fn events(&self) -> &[SaleEvent] {
        &self.events
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn position(&self) -> LedgerPosition {
        self.clock.position()
    }

    fn running(&self) -> Result<&RunningSale> {
        self.running.as_ref().ok_or(CrowdsaleError::WrongStage {
            expected: Stage::Active,
            actual: Stage::Created,
        })
    }

    fn require_stage(&self, expected: Stage) -> Result<()> {
        let actual = self.stage();
        if actual == expected {
            Ok(())
        } else {
            Err(CrowdsaleError::WrongStage { expected, actual })
        }
    }

    fn require_in_sale(&self, interval: u64) -> Result<()> {
        if interval >= self.config.number_of_intervals {
            return Err(CrowdsaleError::IntervalOutOfRange {
                interval,
                number_of_intervals: self.config.number_of_intervals,
            });
        }
        Ok(())
    }

    fn require_token(&self, token: &dyn TokenLedger) -> Result<()> {
        if token.address() != self.config.token {
            return Err(CrowdsaleError::TokenMismatch {
                expected: self.config.token,
                actual: token.address(),
            });
        }
        Ok(())
    }

    /// Intervals below this bound are settled and may be claimed.
    fn settled_bound(&self, run: &RunningSale) -> u64 {
        let n = self.config.number_of_intervals;
        if self.stage() == Stage::Ended {
            n
        } else {
            run.scheduler.interval_at(self.position()).min(n)
        }
    }

    /// Memoize parameters up to `interval` (capped at the last sale interval).
    fn sync_intervals(&mut self, interval: u64) -> Result<()> {
        let upto = interval.min(self.config.number_of_intervals.saturating_sub(1));
        let participation = &self.participation;
        if let Some(run) = self.running.as_mut() {
            run.adjuster.materialize(upto, |i| participation.total(i))?;
        }
        Ok(())
    }
}
