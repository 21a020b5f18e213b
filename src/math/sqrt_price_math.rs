use crate::error::{Error, MathError, StateError};
use crate::math::full_math::{div_rounding_up, mul_div, mul_div_rounding_up};
use crate::{Q96, RESOLUTION, U160_MAX};
use alloy_primitives::U256;

/// Next sqrt price after adding (`add`) or removing token0, rounded up.
///
/// Rounding up keeps the price on the side that never hands out more
/// token1 than the liquidity allows.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    if amount.is_zero() {
        return Ok(sqrt_p_x96);
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let product = amount.checked_mul(sqrt_p_x96);

    if add {
        if let Some(product) = product {
            if let Some(denominator) = numerator1.checked_add(product) {
                return Ok(mul_div_rounding_up(numerator1, sqrt_p_x96, denominator)?);
            }
        }
        let denominator = (numerator1 / sqrt_p_x96)
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        Ok(div_rounding_up(numerator1, denominator))
    } else {
        match product {
            Some(product) if numerator1 > product => {
                Ok(mul_div_rounding_up(numerator1, sqrt_p_x96, numerator1 - product)?)
            }
            _ => Err(StateError::InsufficientReserves.into()),
        }
    }
}

/// Next sqrt price after adding (`add`) or removing token1, rounded down.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    let liquidity = U256::from(liquidity);

    let next = if add {
        let quotient = if amount <= U160_MAX {
            (amount << RESOLUTION) / liquidity
        } else {
            mul_div(amount, Q96, liquidity)?
        };
        sqrt_p_x96.checked_add(quotient).ok_or(MathError::Overflow)?
    } else {
        let quotient = if amount <= U160_MAX {
            div_rounding_up(amount << RESOLUTION, liquidity)
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };
        if sqrt_p_x96 <= quotient {
            return Err(StateError::InsufficientReserves.into());
        }
        sqrt_p_x96 - quotient
    };

    if next > U160_MAX {
        return Err(MathError::Overflow.into());
    }
    Ok(next)
}

/// Amount of token0 between two sqrt prices for `liquidity`.
pub fn get_amount_0_delta(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_a_x96.is_zero() {
        return Err(StateError::SqrtRatioIsZero.into());
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = sqrt_ratio_b_x96 - sqrt_ratio_a_x96;

    if round_up {
        Ok(div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b_x96)?,
            sqrt_ratio_a_x96,
        ))
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_ratio_b_x96)? / sqrt_ratio_a_x96)
    }
}

/// Amount of token1 between two sqrt prices for `liquidity`.
pub fn get_amount_1_delta(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    } else {
        mul_div(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    }
}

/// Next sqrt price when `amount_in` of the input token enters the pool.
pub fn get_next_sqrt_price_from_input(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if sqrt_p_x96.is_zero() {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if liquidity == 0 {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_in, true)
    }
}

/// Next sqrt price when `amount_out` of the output token leaves the pool.
pub fn get_next_sqrt_price_from_output(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if sqrt_p_x96.is_zero() {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if liquidity == 0 {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_out, false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    const PRICE_ONE: U256 = Q96;

    fn u(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    // ---------------- next price from input ----------------

    #[test]
    fn input_rejects_zero_price_and_liquidity() {
        let result = get_next_sqrt_price_from_input(U256::ZERO, 0, U256::from(1u8), false);
        assert!(matches!(result, Err(Error::StateError(StateError::SqrtPriceIsZero))));

        let result = get_next_sqrt_price_from_input(U256::ONE, 0, U256::from(1u8), true);
        assert!(matches!(result, Err(Error::StateError(StateError::LiquidityIsZero))));
    }

    #[test]
    fn input_overflowing_the_price_fails() {
        let result = get_next_sqrt_price_from_input(U160_MAX, 1024, U256::from(1024), false);
        assert!(matches!(result, Err(Error::MathError(MathError::Overflow))));
    }

    #[test]
    fn zero_input_keeps_the_price() {
        for zero_for_one in [true, false] {
            let result =
                get_next_sqrt_price_from_input(PRICE_ONE, 1e17 as u128, U256::ZERO, zero_for_one);
            assert_eq!(result.unwrap(), PRICE_ONE);
        }
    }

    #[test]
    fn tenth_of_a_token_moves_the_price() {
        let result =
            get_next_sqrt_price_from_input(PRICE_ONE, 1e18 as u128, u("100000000000000000"), false);
        assert_eq!(result.unwrap(), u("87150978765690771352898345369"));

        let result =
            get_next_sqrt_price_from_input(PRICE_ONE, 1e18 as u128, u("100000000000000000"), true);
        assert_eq!(result.unwrap(), u("72025602285694852357767227579"));
    }

    #[test]
    fn large_token0_input_falls_back_to_the_safe_formula() {
        // amountIn > type(uint96).max
        let result = get_next_sqrt_price_from_input(
            PRICE_ONE,
            1e19 as u128,
            u("1267650600228229401496703205376"),
            true,
        );
        assert_eq!(result.unwrap(), u("624999999995069620"));
    }

    // ---------------- next price from output ----------------

    #[test]
    fn output_at_or_above_virtual_reserves_fails() {
        let price = u("20282409603651670423947251286016");
        for (amount, zero_for_one) in [(4u64, false), (5, false), (262144, true), (262145, true)] {
            let result = get_next_sqrt_price_from_output(price, 1024, U256::from(amount), zero_for_one);
            assert!(matches!(
                result,
                Err(Error::StateError(StateError::InsufficientReserves))
            ));
        }

        let result = get_next_sqrt_price_from_output(price, 1024, U256::from(262143), true);
        assert_eq!(result.unwrap(), u("77371252455336267181195264"));
    }

    #[test]
    fn tenth_of_a_token_out_moves_the_price() {
        let result =
            get_next_sqrt_price_from_output(PRICE_ONE, 1e18 as u128, U256::from(1e17 as u128), false);
        assert_eq!(result.unwrap(), u("88031291682515930659493278152"));

        let result =
            get_next_sqrt_price_from_output(PRICE_ONE, 1e18 as u128, U256::from(1e17 as u128), true);
        assert_eq!(result.unwrap(), u("71305346262837903834189555302"));
    }

    // ---------------- amount deltas ----------------

    #[test]
    fn amount_deltas_between_price_one_and_1_21() {
        let upper = u("87150978765690771352898345369");

        let amount_0 = get_amount_0_delta(PRICE_ONE, upper, 1e18 as u128, true).unwrap();
        assert_eq!(amount_0, u("90909090909090910"));
        let amount_0_down = get_amount_0_delta(PRICE_ONE, upper, 1e18 as u128, false).unwrap();
        assert_eq!(amount_0_down, amount_0 - U256::ONE);

        let amount_1 = get_amount_1_delta(PRICE_ONE, upper, 1e18 as u128, true).unwrap();
        assert_eq!(amount_1, u("100000000000000000"));
        let amount_1_down = get_amount_1_delta(PRICE_ONE, upper, 1e18 as u128, false).unwrap();
        assert_eq!(amount_1_down, amount_1 - U256::ONE);
    }

    #[test]
    fn amount_deltas_are_zero_without_liquidity() {
        let upper = u("87150978765690771352898345369");
        assert_eq!(get_amount_0_delta(PRICE_ONE, upper, 0, true).unwrap(), U256::ZERO);
        assert_eq!(get_amount_1_delta(PRICE_ONE, upper, 0, true).unwrap(), U256::ZERO);
    }

    #[test]
    fn amount_0_delta_for_prices_that_overflow_the_product() {
        let lower = u("2787593149816327892691964784081045188247552");
        let upper = u("22300745198530623141535718272648361505980416");
        let up = get_amount_0_delta(lower, upper, 1e18 as u128, true).unwrap();
        let down = get_amount_0_delta(lower, upper, 1e18 as u128, false).unwrap();
        assert_eq!(up, down + U256::ONE);
    }
}
