//! Adaptive reserve pricing
//!
//! Each interval carries a reference-currency reserve price, the matching
//! native-currency price and the contribution volume the sale targets
//! (`reserve_amount`). Interval 0 comes straight from the initialization
//! inputs; every later interval is derived once from the previous interval's
//! realized demand and then memoized.
//!
//! ## Adjustment rule
//! - `deviation = |realized - target| * 10_000 / target` (bps)
//! - within `tolerance_bps`: price carried forward
//! - up to `strong_bps`: step = deviation - tolerance
//! - beyond `strong_bps`: step = (strong - tolerance) + (deviation - strong) / 4
//! - step capped at `max_step_bps`, applied upwards when demand beat the
//!   target and downwards otherwise, clamped to `[floor, ceiling]`
//!
//! The reserve amount is always re-derived from the price, so both move in the
//! same direction and an interval never sells more than `tokens_per_interval`.

use crate::errors::{CrowdsaleError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tranche_primitives::{mul_div, Amount, ConfigError, BPS_DENOMINATOR, UNIT};

// =============================================================================
// BANDS
// =============================================================================

/// Tolerance and step limits for the reserve adjustment, in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveBands {
    /// Deviation at or below which the price is carried forward.
    pub tolerance_bps: u64,
    /// Deviation above which the step grows at a quarter of the rate.
    pub strong_bps: u64,
    /// Largest move applied to the price in a single interval.
    pub max_step_bps: u64,
}

impl Default for ReserveBands {
    fn default() -> Self {
        Self {
            tolerance_bps: 3_000,
            strong_bps: 7_000,
            max_step_bps: 5_000,
        }
    }
}

impl ReserveBands {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.tolerance_bps >= self.strong_bps {
            return Err(ConfigError::Invalid(format!(
                "tolerance_bps ({}) must be below strong_bps ({})",
                self.tolerance_bps, self.strong_bps
            )));
        }
        if self.max_step_bps == 0 || u128::from(self.max_step_bps) >= BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "max_step_bps must be in 1..{BPS_DENOMINATOR}, got {}",
                self.max_step_bps
            )));
        }
        Ok(())
    }

    /// Step (bps) for a given deviation (bps).
    pub fn step_bps(&self, deviation_bps: u128) -> u128 {
        let tolerance = u128::from(self.tolerance_bps);
        let strong = u128::from(self.strong_bps);
        let step = if deviation_bps <= tolerance {
            0
        } else if deviation_bps <= strong {
            deviation_bps - tolerance
        } else {
            (strong - tolerance) + (deviation_bps - strong) / 4
        };
        step.min(u128::from(self.max_step_bps))
    }
}

/// Direction and size of the move from one interval to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    Hold,
    Raise(u128),
    Lower(u128),
}

// =============================================================================
// INTERVAL PARAMETERS
// =============================================================================

/// Pricing parameters of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalParams {
    pub index: u64,
    /// Reference-currency price per whole token (18 decimals).
    pub reserve_price_usd: Amount,
    /// Native-currency price per whole token (18 decimals).
    pub reserve_price: Amount,
    /// Contribution volume the interval targets, in native base units.
    pub reserve_amount: Amount,
}

// =============================================================================
// ADJUSTER
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveAdjuster {
    bands: ReserveBands,
    floor: Amount,
    ceiling: Amount,
    tokens_per_interval: Amount,
    eth_price: Amount,
    intervals: Vec<IntervalParams>,
}

impl ReserveAdjuster {
    /// Build the adjuster and materialize interval 0.
    pub fn genesis(
        bands: ReserveBands,
        floor: Amount,
        ceiling: Amount,
        reserve_start: Amount,
        eth_price: Amount,
        tokens_per_interval: Amount,
    ) -> Result<Self> {
        if eth_price == 0 {
            return Err(CrowdsaleError::InvalidConfig("reference price must be positive".into()));
        }
        if floor == 0 || floor > ceiling {
            return Err(CrowdsaleError::InvalidConfig(format!(
                "price bounds [{floor}, {ceiling}] are empty"
            )));
        }
        let mut adjuster = Self {
            bands,
            floor,
            ceiling,
            tokens_per_interval,
            eth_price,
            intervals: Vec::new(),
        };
        let first = adjuster.price_interval(0, reserve_start.clamp(floor, ceiling))?;
        debug!(
            target: "crowdsale",
            reserve_price = first.reserve_price,
            reserve_amount = first.reserve_amount,
            "Materialized interval 0"
        );
        adjuster.intervals.push(first);
        Ok(adjuster)
    }

    pub fn bands(&self) -> ReserveBands {
        self.bands
    }

    pub fn eth_price(&self) -> Amount {
        self.eth_price
    }

    pub fn tokens_per_interval(&self) -> Amount {
        self.tokens_per_interval
    }

    pub fn floor(&self) -> Amount {
        self.floor
    }

    pub fn ceiling(&self) -> Amount {
        self.ceiling
    }

    /// Memoized parameters, if `index` has been materialized.
    pub fn get(&self, index: u64) -> Option<&IntervalParams> {
        usize::try_from(index).ok().and_then(|i| self.intervals.get(i))
    }

    /// Number of materialized intervals.
    pub fn materialized(&self) -> u64 {
        self.intervals.len() as u64
    }

    /// Compare realized demand with the target of the interval it belongs to.
    pub fn adjustment(&self, target: Amount, realized: Amount) -> Result<Adjustment> {
        let difference = realized.abs_diff(target);
        let deviation = mul_div(difference, BPS_DENOMINATOR, target)
            .ok_or(CrowdsaleError::Overflow("reserve deviation"))?;
        let step = self.bands.step_bps(deviation);
        Ok(match step {
            0 => Adjustment::Hold,
            step if realized > target => Adjustment::Raise(step),
            step => Adjustment::Lower(step),
        })
    }

    /// Parameters for the interval after `prev`, given `prev`'s realized demand.
    pub fn derive_next(&self, prev: &IntervalParams, realized: Amount) -> Result<IntervalParams> {
        let usd = match self.adjustment(prev.reserve_amount, realized)? {
            Adjustment::Hold => prev.reserve_price_usd,
            Adjustment::Raise(step) => {
                let delta = mul_div(prev.reserve_price_usd, step, BPS_DENOMINATOR)
                    .ok_or(CrowdsaleError::Overflow("reserve step"))?;
                prev.reserve_price_usd.saturating_add(delta)
            }
            Adjustment::Lower(step) => {
                let delta = mul_div(prev.reserve_price_usd, step, BPS_DENOMINATOR)
                    .ok_or(CrowdsaleError::Overflow("reserve step"))?;
                prev.reserve_price_usd.saturating_sub(delta)
            }
        };
        self.price_interval(prev.index + 1, usd.clamp(self.floor, self.ceiling))
    }

    /// Parameters of every interval `0..=upto`, memoized or derived on the fly.
    /// Nothing is stored.
    pub fn params_through<F>(&self, upto: u64, realized: F) -> Result<Vec<IntervalParams>>
    where
        F: Fn(u64) -> Amount,
    {
        let mut params: Vec<IntervalParams> = self
            .intervals
            .iter()
            .take_while(|p| p.index <= upto)
            .copied()
            .collect();
        while let Some(last) = params.last().copied() {
            if last.index >= upto {
                break;
            }
            params.push(self.derive_next(&last, realized(last.index))?);
        }
        Ok(params)
    }

    /// Parameters of interval `index` without materializing anything.
    pub fn preview<F>(&self, index: u64, realized: F) -> Result<IntervalParams>
    where
        F: Fn(u64) -> Amount,
    {
        if let Some(params) = self.get(index) {
            return Ok(*params);
        }
        self.params_through(index, realized)?
            .pop()
            .ok_or(CrowdsaleError::Overflow("interval preview"))
    }

    /// Derive and memoize every interval up to `upto`, in order. Intervals
    /// nobody touched are derived with whatever demand they recorded.
    pub fn materialize<F>(&mut self, upto: u64, realized: F) -> Result<u64>
    where
        F: Fn(u64) -> Amount,
    {
        let mut derived = Vec::new();
        let mut last = match self.intervals.last() {
            Some(last) => *last,
            None => return Ok(0),
        };
        while last.index < upto {
            let next = self.derive_next(&last, realized(last.index))?;
            debug!(
                target: "crowdsale",
                interval = next.index,
                reserve_price_usd = next.reserve_price_usd,
                reserve_price = next.reserve_price,
                reserve_amount = next.reserve_amount,
                "Materialized interval"
            );
            derived.push(next);
            last = next;
        }
        let count = derived.len() as u64;
        self.intervals.extend(derived);
        Ok(count)
    }

    /// Replace the reference price used for intervals derived from now on.
    pub fn rebase(&mut self, eth_price: Amount) -> Result<()> {
        if eth_price == 0 {
            return Err(CrowdsaleError::InvalidConfig("reference price must be positive".into()));
        }
        self.eth_price = eth_price;
        Ok(())
    }

    fn price_interval(&self, index: u64, reserve_price_usd: Amount) -> Result<IntervalParams> {
        let reserve_price = mul_div(reserve_price_usd, UNIT, self.eth_price)
            .ok_or(CrowdsaleError::Overflow("reserve price"))?
            .max(1);
        let reserve_amount = mul_div(self.tokens_per_interval, reserve_price, UNIT)
            .ok_or(CrowdsaleError::Overflow("reserve amount"))?
            .max(1);
        Ok(IntervalParams {
            index,
            reserve_price_usd,
            reserve_price,
            reserve_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranche_primitives::units;

    fn adjuster() -> ReserveAdjuster {
        ReserveAdjuster::genesis(
            ReserveBands::default(),
            units(1) / 10,
            units(10),
            units(1),
            units(100),
            units(1_000),
        )
        .unwrap()
    }

    #[test]
    fn genesis_converts_with_reference_price() {
        let adjuster = adjuster();
        let first = adjuster.get(0).unwrap();
        assert_eq!(first.reserve_price_usd, units(1));
        assert_eq!(first.reserve_price, 10u128.pow(16));
        assert_eq!(first.reserve_amount, 10u128.pow(19));
    }

    #[test]
    fn reserve_start_is_clamped() {
        let adjuster = ReserveAdjuster::genesis(
            ReserveBands::default(),
            units(2),
            units(10),
            units(1),
            units(100),
            units(1_000),
        )
        .unwrap();
        assert_eq!(adjuster.get(0).unwrap().reserve_price_usd, units(2));
    }

    #[test]
    fn step_follows_bands() {
        let bands = ReserveBands::default();
        assert_eq!(bands.step_bps(0), 0);
        assert_eq!(bands.step_bps(3_000), 0);
        assert_eq!(bands.step_bps(3_001), 1);
        assert_eq!(bands.step_bps(7_000), 4_000);
        assert_eq!(bands.step_bps(7_400), 4_100);
        assert_eq!(bands.step_bps(10_000), 4_750);
        assert_eq!(bands.step_bps(1_000_000), 5_000);
    }

    #[test]
    fn demand_within_tolerance_holds_price() {
        let adjuster = adjuster();
        let first = *adjuster.get(0).unwrap();
        // 30% under target
        let next = adjuster.derive_next(&first, first.reserve_amount * 7 / 10).unwrap();
        assert_eq!(next.reserve_price_usd, first.reserve_price_usd);
        assert_eq!(next.reserve_amount, first.reserve_amount);
        assert_eq!(next.index, 1);
    }

    #[test]
    fn excess_demand_raises_price_and_reserve() {
        let adjuster = adjuster();
        let first = *adjuster.get(0).unwrap();
        // 50% over target: step 2000 bps
        let next = adjuster.derive_next(&first, first.reserve_amount * 3 / 2).unwrap();
        assert_eq!(next.reserve_price_usd, units(12) / 10);
        assert!(next.reserve_amount > first.reserve_amount);
    }

    #[test]
    fn missing_demand_lowers_price_and_reserve() {
        let adjuster = adjuster();
        let first = *adjuster.get(0).unwrap();
        // no demand: deviation 10000 bps, step 4750 bps
        let next = adjuster.derive_next(&first, 0).unwrap();
        assert_eq!(next.reserve_price_usd, units(1) - units(1) * 4_750 / 10_000);
        assert!(next.reserve_amount < first.reserve_amount);
    }

    #[test]
    fn price_never_leaves_bounds() {
        let adjuster = adjuster();
        let mut params = *adjuster.get(0).unwrap();
        for _ in 0..20 {
            params = adjuster.derive_next(&params, 0).unwrap();
        }
        assert_eq!(params.reserve_price_usd, units(1) / 10);

        for _ in 0..40 {
            params = adjuster
                .derive_next(&params, params.reserve_amount * 100)
                .unwrap();
        }
        assert_eq!(params.reserve_price_usd, units(10));
    }

    #[test]
    fn preview_matches_materialize() {
        let mut adjuster = adjuster();
        let demand = |i: u64| if i == 1 { units(50) } else { 0 };
        let previewed = adjuster.params_through(4, demand).unwrap();
        assert_eq!(adjuster.materialized(), 1);

        assert_eq!(adjuster.materialize(4, demand).unwrap(), 4);
        for params in &previewed {
            assert_eq!(adjuster.get(params.index), Some(params));
        }
        assert_eq!(adjuster.preview(2, |_| 0).unwrap(), previewed[2]);
    }

    #[test]
    fn rebase_only_affects_later_intervals() {
        let mut adjuster = adjuster();
        adjuster.materialize(1, |_| units(10)).unwrap();
        let before = *adjuster.get(1).unwrap();

        adjuster.rebase(units(200)).unwrap();
        assert_eq!(adjuster.get(1), Some(&before));

        adjuster.materialize(2, |_| units(10)).unwrap();
        let after = adjuster.get(2).unwrap();
        assert_eq!(after.reserve_price_usd, before.reserve_price_usd);
        assert_eq!(after.reserve_price, before.reserve_price / 2);
    }

    #[test]
    fn bands_validate() {
        assert!(ReserveBands::default().validate().is_ok());
        let inverted = ReserveBands {
            tolerance_bps: 7_000,
            strong_bps: 3_000,
            max_step_bps: 5_000,
        };
        assert!(inverted.validate().is_err());
        let no_step = ReserveBands {
            max_step_bps: 0,
            ..ReserveBands::default()
        };
        assert!(no_step.validate().is_err());
    }
}
