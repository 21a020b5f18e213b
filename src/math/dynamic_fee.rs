//! Price-impact dependent LP fee of dynamic-fee pools.
//!
//! The fee curve is anchored at the "zero price impact" price, the pool
//! price with the decayed net impact of recent swaps removed. Moving away
//! from it in the swap direction raises the fee linearly from `min_fee` to
//! `max_fee`; the two kink prices mark where the curve leaves its flat
//! parts.

use crate::codec::packed::{DexVariables2, X15};
use crate::error::{Error, MathError, StateError};
use crate::math::full_math::{mul_div, sqrt_shifted};
use crate::{Q96, U256_E6, U256_1};
use alloy_primitives::U256;

pub const FEE_PRECISION: u32 = 1_000_000;

/// Smallest representable price (Q96), `ceil(MIN_SQRT_RATIO^2 / 2^96)`.
pub const MIN_PRICE_X96: U256 = U256_1;
/// Largest representable price (Q96), `floor(MAX_SQRT_RATIO^2 / 2^96)`.
pub const MAX_PRICE_X96: U256 = U256::from_limbs([
    7222684863060036565,
    17412724968505025772,
    17368263469811889161,
    4294644429,
]);

const PRICE_SQRT_SPLIT: U256 = U256::from_limbs([0, 0, 1 << 32, 0]);

/// Price (Q96) of a sqrt price (Q64.96).
pub fn price_x96_from_sqrt(sqrt_price_x96: U256) -> Result<U256, MathError> {
    mul_div(sqrt_price_x96, sqrt_price_x96, Q96)
}

/// Sqrt price (Q64.96) of a price (Q96), floored.
pub fn sqrt_price_x96_from_price(price_x96: U256) -> Result<U256, MathError> {
    if price_x96 < PRICE_SQRT_SPLIT {
        sqrt_shifted(price_x96, 96)
    } else {
        Ok(sqrt_shifted(price_x96, 84)? << 6)
    }
}

/// Seconds since the last impact update, on the 15-bit wrapping clock.
fn elapsed_since(last_update: u32, now: u64) -> u64 {
    let now = now & X15;
    let last = last_update as u64 & X15;
    if now >= last { now - last } else { now + X15 + 1 - last }
}

/// Net price impact (1e6 = 100%) left after linear decay at time `now`.
pub fn net_price_impact(vars: &DexVariables2, now: u64) -> i64 {
    let elapsed = elapsed_since(vars.last_update_timestamp, now);
    let decay = vars.decay_time_remaining as u64;

    if elapsed >= decay {
        return 0;
    }

    let magnitude = (vars.absolute_net_price_impact as u64 * (decay - elapsed) / decay) as i64;
    if vars.net_price_impact_positive {
        magnitude
    } else {
        -magnitude
    }
}

/// Fee parameters of one dynamic-fee swap, fixed at the swap's start price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicFeeVariables {
    pub zero_for_one: bool,
    pub zero_price_impact_price_x96: U256,
    pub min_fee_kink_sqrt_price_x96: U256,
    pub max_fee_kink_sqrt_price_x96: U256,
    pub min_fee: u32,
    pub max_fee: u32,
    pub division_factor: u32,
}

impl DynamicFeeVariables {
    pub fn derive(
        sqrt_price_x96: U256,
        zero_for_one: bool,
        vars: &DexVariables2,
        now: u64,
    ) -> Result<Self, Error> {
        let impact = net_price_impact(vars, now);
        let denominator = FEE_PRECISION as i64 + impact;
        if denominator <= 0 {
            return Err(StateError::InvalidNetPriceImpact(impact).into());
        }

        let price_x96 = price_x96_from_sqrt(sqrt_price_x96)?;
        let zero_price_impact_price_x96 =
            mul_div(price_x96, U256_E6, U256::from(denominator as u64))?;

        let kink_sqrt_price = |fee: u32| -> Result<U256, MathError> {
            let kink_impact = (fee as u64 * vars.price_impact_to_fee_division_factor as u64)
                .min(FEE_PRECISION as u64);
            let factor = if zero_for_one {
                FEE_PRECISION as u64 - kink_impact
            } else {
                FEE_PRECISION as u64 + kink_impact
            };
            let price = mul_div(zero_price_impact_price_x96, U256::from(factor), U256_E6)?
                .max(MIN_PRICE_X96)
                .min(MAX_PRICE_X96);
            sqrt_price_x96_from_price(price)
        };

        Ok(Self {
            zero_for_one,
            zero_price_impact_price_x96,
            min_fee_kink_sqrt_price_x96: kink_sqrt_price(vars.min_fee)?,
            max_fee_kink_sqrt_price_x96: kink_sqrt_price(vars.max_fee)?,
            min_fee: vars.min_fee,
            max_fee: vars.max_fee,
            division_factor: vars.price_impact_to_fee_division_factor,
        })
    }

    /// LP fee (1e6 = 100%) charged at `price_x96`, clamped to the fee band.
    ///
    /// Prices on the wrong side of the zero-impact price pay `min_fee`.
    pub fn fee_at_price(&self, price_x96: U256) -> Result<u32, MathError> {
        if self.division_factor == 0 || self.zero_price_impact_price_x96.is_zero() {
            return Ok(self.min_fee);
        }

        let zero = self.zero_price_impact_price_x96;
        let diff = if self.zero_for_one {
            zero.saturating_sub(price_x96)
        } else {
            price_x96.saturating_sub(zero)
        };

        let impact = mul_div(diff, U256_E6, zero)?;
        let fee = impact / U256::from(self.division_factor);
        let fee = u32::try_from(fee).unwrap_or(u32::MAX);

        Ok(fee.max(self.min_fee).min(self.max_fee))
    }

    /// Fee for a segment running between two sqrt prices, taken at the
    /// mean of the two end prices.
    pub fn fee_between(&self, sqrt_price_a_x96: U256, sqrt_price_b_x96: U256) -> Result<u32, MathError> {
        let a = price_x96_from_sqrt(sqrt_price_a_x96)?;
        let b = price_x96_from_sqrt(sqrt_price_b_x96)?;
        let mean = (a >> 1) + (b >> 1) + (a & b & U256_1);
        self.fee_at_price(mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::{MAX_SQRT_RATIO, MIN_SQRT_RATIO};

    fn vars(impact: u32, positive: bool) -> DexVariables2 {
        DexVariables2 {
            fee_version: 1,
            lp_fee: 3_000,
            min_fee: 100,
            max_fee: 10_000,
            price_impact_to_fee_division_factor: 2,
            net_price_impact_positive: positive,
            absolute_net_price_impact: impact,
            last_update_timestamp: 1_000,
            decay_time_remaining: 600,
            ..Default::default()
        }
    }

    // ---------------- price helpers ----------------

    #[test]
    fn price_bounds_match_sqrt_ratio_bounds() {
        assert_eq!(price_x96_from_sqrt(MAX_SQRT_RATIO).unwrap(), MAX_PRICE_X96);
        assert_eq!(price_x96_from_sqrt(MIN_SQRT_RATIO).unwrap(), U256::ZERO);
        assert_eq!(sqrt_price_x96_from_price(Q96).unwrap(), Q96);
    }

    #[test]
    fn sqrt_of_large_price_stays_within_one_ulp_block() {
        let sqrt = sqrt_price_x96_from_price(MAX_PRICE_X96).unwrap();
        assert!(sqrt <= MAX_SQRT_RATIO);
        assert!(MAX_SQRT_RATIO - sqrt < U256::from(128u64));
    }

    // ---------------- net price impact ----------------

    #[test]
    fn impact_decays_linearly() {
        let v = vars(1_000, true);
        assert_eq!(net_price_impact(&v, 1_000), 1_000);
        assert_eq!(net_price_impact(&v, 1_300), 500);
        assert_eq!(net_price_impact(&v, 1_600), 0);
        assert_eq!(net_price_impact(&vars(1_000, false), 1_150), -750);
    }

    #[test]
    fn impact_clock_wraps_at_15_bits() {
        let v = DexVariables2 {
            last_update_timestamp: 32_760,
            ..vars(1_000, true)
        };
        // 32_778 & X15 == 10, i.e. 18 seconds after 32_760.
        assert_eq!(elapsed_since(32_760, 32_778), 18);
        assert_eq!(net_price_impact(&v, 32_778), 1_000 * 582 / 600);
    }

    #[test]
    fn impact_of_minus_one_hundred_percent_is_rejected() {
        let v = vars(1_000_000, false);
        let res = DynamicFeeVariables::derive(Q96, true, &v, 1_000);
        assert!(matches!(
            res,
            Err(Error::StateError(StateError::InvalidNetPriceImpact(-1_000_000)))
        ));
    }

    // ---------------- kinks ----------------

    #[test]
    fn zero_impact_price_removes_the_net_impact() {
        let fee_vars = DynamicFeeVariables::derive(Q96, false, &vars(1_000, true), 1_000).unwrap();
        assert_eq!(
            fee_vars.zero_price_impact_price_x96,
            mul_div(Q96, U256_E6, U256::from(1_001_000u64)).unwrap()
        );
    }

    #[test]
    fn kinks_are_ordered_along_the_swap_direction() {
        let v = vars(0, true);

        let up = DynamicFeeVariables::derive(Q96, false, &v, 1_000).unwrap();
        assert!(Q96 < up.min_fee_kink_sqrt_price_x96);
        assert!(up.min_fee_kink_sqrt_price_x96 < up.max_fee_kink_sqrt_price_x96);

        let down = DynamicFeeVariables::derive(Q96, true, &v, 1_000).unwrap();
        assert!(Q96 > down.min_fee_kink_sqrt_price_x96);
        assert!(down.min_fee_kink_sqrt_price_x96 > down.max_fee_kink_sqrt_price_x96);
    }

    #[test]
    fn kink_impact_is_capped_at_one_hundred_percent() {
        let v = DexVariables2 {
            max_fee: 60_000,
            price_impact_to_fee_division_factor: 100,
            ..vars(0, true)
        };
        let down = DynamicFeeVariables::derive(Q96, true, &v, 1_000).unwrap();
        assert_eq!(
            down.max_fee_kink_sqrt_price_x96,
            sqrt_price_x96_from_price(MIN_PRICE_X96).unwrap()
        );
    }

    // ---------------- fee curve ----------------

    #[test]
    fn fee_grows_with_price_impact() {
        let fee_vars = DynamicFeeVariables::derive(Q96, false, &vars(0, true), 1_000).unwrap();

        // 1/64 above the zero-impact price is 15625 pips, halved by the factor.
        let price = Q96 + (Q96 >> 6);
        assert_eq!(fee_vars.fee_at_price(price).unwrap(), 7_812);

        assert_eq!(fee_vars.fee_at_price(Q96).unwrap(), 100);
        assert_eq!(fee_vars.fee_at_price(Q96 * U256::from(2u64)).unwrap(), 10_000);
    }

    #[test]
    fn price_against_the_direction_pays_min_fee() {
        let fee_vars = DynamicFeeVariables::derive(Q96, true, &vars(0, true), 1_000).unwrap();
        assert_eq!(fee_vars.fee_at_price(Q96 * U256::from(3u64)).unwrap(), 100);
    }

    #[test]
    fn fee_between_uses_the_mean_price() {
        let fee_vars = DynamicFeeVariables::derive(Q96, false, &vars(0, true), 1_000).unwrap();
        let start = Q96;
        let end = sqrt_price_x96_from_price(Q96 * U256::from(102u64) / U256::from(100u64)).unwrap();
        let fee = fee_vars.fee_between(start, end).unwrap();
        // Mean impact is ~1%, fee ~5000 pips.
        assert!((4_990..=5_000).contains(&fee), "fee {fee}");
    }
}
