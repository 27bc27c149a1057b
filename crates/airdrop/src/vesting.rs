//! Linear per-period vesting
//!
//! Every full period since the last claim releases
//! `max(original * rate_bps / 10_000, min_release)`, never more than what is
//! left. Periods that were not claimed accumulate, and the claim position
//! only advances by whole periods so partial progress carries over.
//!
//! Settings load from TOML and accept `TRANCHE_VESTING_PERIOD` as an
//! environment override.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tranche_primitives::{
    apply_bps, env_override, from_toml_str, read_toml_file, units, Amount, ConfigError,
    LedgerPosition, BPS_DENOMINATOR,
};

pub const ENV_VESTING_PERIOD: &str = "TRANCHE_VESTING_PERIOD";

/// Default vesting period in ledger positions.
pub const DEFAULT_VESTING_PERIOD: u64 = 30;
/// Default release per period: 1% of the original allocation.
pub const DEFAULT_RATE_BPS: u64 = 100;
/// Default minimum release per period, in whole tokens.
pub const DEFAULT_MIN_RELEASE_TOKENS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VestingSettings {
    pub period: u64,
    pub rate_bps: u64,
    /// Minimum release per period, in whole tokens.
    pub min_release: u64,
}

impl Default for VestingSettings {
    fn default() -> Self {
        Self {
            period: DEFAULT_VESTING_PERIOD,
            rate_bps: DEFAULT_RATE_BPS,
            min_release: DEFAULT_MIN_RELEASE_TOKENS,
        }
    }
}

/// Outcome of a vesting computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub amount: Amount,
    pub periods: u64,
    pub next_claim_position: LedgerPosition,
}

impl VestingSettings {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = from_toml_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Self = read_toml_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(period) = env_override::<u64>(ENV_VESTING_PERIOD)? {
            self.period = period;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::Invalid("vesting period must be positive".into()));
        }
        if self.rate_bps == 0 || u128::from(self.rate_bps) > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "rate_bps must be in 1..={BPS_DENOMINATOR}, got {}",
                self.rate_bps
            )));
        }
        Ok(())
    }

    /// Minimum release per period in base units.
    pub fn min_release_amount(&self) -> Amount {
        units(u128::from(self.min_release))
    }

    /// Tokens released per elapsed period for an `original` allocation.
    pub fn per_period(&self, original: Amount) -> Amount {
        apply_bps(original, u128::from(self.rate_bps))
            .unwrap_or(Amount::MAX)
            .max(self.min_release_amount())
    }

    /// What a claim at `now` would release, or `None` if no full period has
    /// elapsed since `last_claim` or nothing remains.
    pub fn release(
        &self,
        original: Amount,
        remaining: Amount,
        last_claim: LedgerPosition,
        now: LedgerPosition,
    ) -> Option<Release> {
        let periods = now.saturating_sub(last_claim) / self.period;
        if periods == 0 || remaining == 0 {
            return None;
        }
        let accrued = self.per_period(original).saturating_mul(u128::from(periods));
        Some(Release {
            amount: accrued.min(remaining),
            periods,
            next_claim_position: last_claim.saturating_add(periods.saturating_mul(self.period)),
        })
    }

    /// First position at which a claim releases something.
    pub fn next_release_position(&self, last_claim: LedgerPosition) -> LedgerPosition {
        last_claim.saturating_add(self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn small_allocations_release_minimum_then_rest() {
        let vesting = VestingSettings::default();
        // 99 tokens: the minimum release covers everything
        let release = vesting.release(units(99), units(99), 0, 30).unwrap();
        assert_eq!(release.amount, units(99));

        // 101 tokens: 100 first, the last token one period later
        let first = vesting.release(units(101), units(101), 0, 30).unwrap();
        assert_eq!(first.amount, units(100));
        assert_eq!(first.next_claim_position, 30);
        let second = vesting
            .release(units(101), units(1), first.next_claim_position, 60)
            .unwrap();
        assert_eq!(second.amount, units(1));
    }

    #[test]
    fn large_allocations_release_one_percent_per_period() {
        let vesting = VestingSettings::default();
        let release = vesting
            .release(units(30_000), units(30_000), 100, 100 + 3 * 30 + 7)
            .unwrap();
        assert_eq!(release.periods, 3);
        assert_eq!(release.amount, units(900));
        // the 7 positions of partial progress are kept
        assert_eq!(release.next_claim_position, 190);
    }

    #[test]
    fn nothing_before_a_full_period() {
        let vesting = VestingSettings::default();
        assert_eq!(vesting.release(units(500), units(500), 10, 39), None);
        assert_eq!(vesting.next_release_position(10), 40);
        assert_eq!(vesting.release(units(500), 0, 0, 300), None);
    }

    #[test]
    fn settings_load_and_validate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "period = 7200\nrate_bps = 50").unwrap();
        let settings = VestingSettings::load(file.path()).unwrap();
        assert_eq!(settings.period, 7_200);
        assert_eq!(settings.rate_bps, 50);
        assert_eq!(settings.min_release_amount(), units(u128::from(DEFAULT_MIN_RELEASE_TOKENS)));

        let settings = VestingSettings::from_toml("min_release = 250").unwrap();
        assert_eq!(settings.min_release_amount(), units(250));
        assert_eq!(settings.per_period(units(1_000)), units(250));

        assert!(VestingSettings::from_toml("period = 0").is_err());
        assert!(VestingSettings::from_toml("rate_bps = 10001").is_err());
    }

    #[test]
    fn period_env_override() {
        std::env::set_var(ENV_VESTING_PERIOD, "12");
        let settings = VestingSettings::default().with_env_overrides();
        std::env::remove_var(ENV_VESTING_PERIOD);
        assert_eq!(settings.unwrap().period, 12);
    }

    proptest! {
        #[test]
        fn claims_never_exceed_allocation(
            original in 1u128..=units(1_000_000),
            gaps in prop::collection::vec(0u64..200, 1..40),
        ) {
            let vesting = VestingSettings::default();
            let mut remaining = original;
            let mut last_claim = 0u64;
            let mut now = 0u64;
            let mut released = 0u128;
            for gap in gaps {
                now += gap;
                if let Some(release) = vesting.release(original, remaining, last_claim, now) {
                    prop_assert!(release.amount > 0);
                    prop_assert!(release.next_claim_position <= now);
                    prop_assert!(release.next_claim_position > last_claim);
                    remaining -= release.amount;
                    released += release.amount;
                    last_claim = release.next_claim_position;
                }
            }
            prop_assert_eq!(released + remaining, original);
        }
    }
}
