use crate::FastMap;
use crate::error::{Error, MathError, SwapError};
use crate::math::liquidity_math::add_delta;
use crate::math::swap_math::{FeeSchedule, compute_swap_step_with_fees};
use crate::math::tick_bitmap::{TickBitmap, flip_tick, next_initialized_tick_within_one_word};
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::pool::types::Tick;
use alloy_primitives::{I256, U256};

#[derive(Copy, Clone, Debug)]
pub struct SwapParams {
    /// Swap direction: `true` for token0 → token1, `false` for token1 → token0.
    pub zero_for_one: bool,
    /// Positive means exact in, negative means exact out.
    pub amount_specified: I256,
    /// Sqrt price (Q64.96) the swap may not move past.
    pub sqrt_price_limit_x96: U256,
}

impl SwapParams {
    #[inline]
    pub fn new(zero_for_one: bool, amount_specified: I256, sqrt_price_limit_x96: U256) -> Self {
        Self {
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapResult {
    pub amount0_delta: I256,
    pub amount1_delta: I256,
    /// Output side for exact input (negative), input side for exact output.
    pub amount_calculated: I256,
    pub amount_specified_remaining: I256,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
    pub crossed_initialized_ticks: u32,
    pub lp_fee: U256,
    pub protocol_fee: U256,
}

// the top level state of the swap, the results of which are recorded in storage at the end
struct SwapState {
    // the amount remaining to be swapped in/out of the input/output asset
    amount_specified_remaining: I256,
    // the amount already swapped out/in of the output/input asset
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    crossed_initialized_ticks: u32,
    lp_fee: U256,
    protocol_fee: U256,
}

#[derive(Default)]
struct StepComputations {
    sqrt_price_start_x96: U256,
    tick_next: i32,
    initialized: bool,
    sqrt_price_next_x96: U256,
}

/// In-memory concentrated-liquidity state, in adjusted (9-decimal) units.
#[derive(Clone, Debug, Default)]
pub struct PoolState {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
    pub tick_spacing: i32,
    pub bitmap: TickBitmap,
    pub ticks: FastMap<i32, I256>,
}

impl PoolState {
    /// Builds the state from a tick list; uninitialized ticks are skipped.
    pub fn new(
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
        tick_spacing: i32,
        ticks: &[Tick],
    ) -> Result<Self, Error> {
        let mut state = Self {
            sqrt_price_x96,
            tick,
            liquidity,
            tick_spacing,
            ..Default::default()
        };

        for t in ticks.iter().filter(|t| t.is_initialized()) {
            if state.ticks.insert(t.index, t.liquidity_net).is_none() {
                flip_tick(&mut state.bitmap, t.index, tick_spacing)?;
            }
        }

        Ok(state)
    }

    pub fn get_liquidity_net(&self, tick: &i32) -> Option<I256> {
        self.ticks.get(tick).copied()
    }

    /// Simulates a swap against this state without mutating it.
    pub fn swap(&self, params: SwapParams, schedule: &FeeSchedule) -> Result<SwapResult, Error> {
        let amount_specified = params.amount_specified;
        if amount_specified.is_zero() {
            return Err(SwapError::AmountSpecifiedIsZero.into());
        }

        let zero_for_one = params.zero_for_one;
        let sqrt_price_limit_x96 = params.sqrt_price_limit_x96;
        if zero_for_one {
            if sqrt_price_limit_x96 <= MIN_SQRT_RATIO {
                return Err(SwapError::SqrtPriceLimitTooLow.into());
            }
            if sqrt_price_limit_x96 >= self.sqrt_price_x96 {
                return Err(SwapError::SqrtPriceLimitTooHigh.into());
            }
        } else {
            if sqrt_price_limit_x96 >= MAX_SQRT_RATIO {
                return Err(SwapError::SqrtPriceLimitTooHigh.into());
            }
            if sqrt_price_limit_x96 <= self.sqrt_price_x96 {
                return Err(SwapError::SqrtPriceLimitTooLow.into());
            }
        }

        let exact_input = !amount_specified.is_negative();
        if !exact_input && schedule.is_dynamic() {
            return Err(SwapError::ExactOutputWithDynamicFee.into());
        }

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.tick,
            liquidity: self.liquidity,
            crossed_initialized_ticks: 0,
            lp_fee: U256::ZERO,
            protocol_fee: U256::ZERO,
        };

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..Default::default()
            };

            (step.tick_next, step.initialized) = next_initialized_tick_within_one_word(
                &self.bitmap,
                state.tick,
                self.tick_spacing,
                zero_for_one,
            )?;

            if !(MIN_TICK..=MAX_TICK).contains(&step.tick_next) {
                return Err(SwapError::TickOutOfBounds(step.tick_next).into());
            }

            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            let target = if zero_for_one {
                step.sqrt_price_next_x96.max(sqrt_price_limit_x96)
            } else {
                step.sqrt_price_next_x96.min(sqrt_price_limit_x96)
            };

            let fee_step = compute_swap_step_with_fees(
                state.sqrt_price_x96,
                target,
                state.liquidity,
                state.amount_specified_remaining,
                schedule,
            )?;
            state.sqrt_price_x96 = fee_step.sqrt_price_next_x96;

            let amount_in = to_int256(fee_step.amount_in)?;
            let amount_out = to_int256(fee_step.amount_out)?;
            if exact_input {
                state.amount_specified_remaining -= amount_in;
                state.amount_calculated -= amount_out;
            } else {
                state.amount_specified_remaining += amount_out;
                state.amount_calculated += amount_in;
            }

            state.lp_fee = state
                .lp_fee
                .checked_add(fee_step.lp_fee)
                .ok_or(MathError::Overflow)?;
            state.protocol_fee = state
                .protocol_fee
                .checked_add(fee_step.protocol_fee)
                .ok_or(MathError::Overflow)?;

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let mut liquidity_net = self
                        .get_liquidity_net(&step.tick_next)
                        .ok_or(SwapError::MissingTick(step.tick_next))?;
                    if zero_for_one {
                        liquidity_net = liquidity_net.checked_neg().ok_or(MathError::Overflow)?;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;
                    state.crossed_initialized_ticks += 1;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let swapped = amount_specified - state.amount_specified_remaining;
        let (amount0_delta, amount1_delta) = if zero_for_one == exact_input {
            (swapped, state.amount_calculated)
        } else {
            (state.amount_calculated, swapped)
        };

        Ok(SwapResult {
            amount0_delta,
            amount1_delta,
            amount_calculated: state.amount_calculated,
            amount_specified_remaining: state.amount_specified_remaining,
            sqrt_price_x96: state.sqrt_price_x96,
            tick: state.tick,
            liquidity: state.liquidity,
            crossed_initialized_ticks: state.crossed_initialized_ticks,
            lp_fee: state.lp_fee,
            protocol_fee: state.protocol_fee,
        })
    }
}

fn to_int256(value: U256) -> Result<I256, SwapError> {
    I256::try_from(value).map_err(|_| SwapError::AmountExceedsInt256)
}
