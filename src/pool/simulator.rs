use crate::codec::packed::{
    DexVariables2, calculate_vars, verify_adjusted_amount_limits, verify_amount_limits,
};
use crate::config::Config;
use crate::error::{Error, MathError, PoolError, StateError, SwapError};
use crate::math::swap_math::FeeSchedule;
use crate::math::tick_math::{MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick};
use crate::pool::engine::{PoolState, SwapParams};
use crate::pool::types::{Extra, PoolMeta, PoolRecord, StaticExtra, SwapInfo};
use crate::U256_1;
use alloy_primitives::{Address, I256, U256};

/// Quote for one `calc_amount_out` call, in natural token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalcAmountOutResult {
    pub amount_out: U256,
    /// LP plus protocol fee, in output-token units.
    pub fee: U256,
    pub gas: u64,
    pub remaining_amount_in: U256,
    pub swap_info: SwapInfo,
}

/// Immutable quoting snapshot of one pool.
#[derive(Debug, Clone)]
pub struct PoolSimulator {
    address: String,
    exchange: String,
    tokens: [Address; 2],
    reserves: [U256; 2],
    static_extra: StaticExtra,
    extra: Extra,
    state: PoolState,
    tick_min: i32,
    tick_max: i32,
    config: Config,
}

impl PoolSimulator {
    pub fn new(record: &PoolRecord) -> Result<Self, Error> {
        Self::with_config(record, &Config::default())
    }

    pub fn with_config(record: &PoolRecord, config: &Config) -> Result<Self, Error> {
        let static_extra = record.static_extra()?;
        let mut extra = record.extra()?;

        extra.ticks.retain(|t| t.is_initialized());
        extra.ticks.sort_unstable_by_key(|t| t.index);
        if extra.ticks.is_empty() && !config.allow_empty_ticks {
            return Err(PoolError::TicksEmpty.into());
        }

        let tick_spacing = i32::try_from(static_extra.tick_spacing)
            .ok()
            .filter(|spacing| *spacing > 0)
            .ok_or(StateError::InvalidTickSpacing(static_extra.tick_spacing))?;

        let state = PoolState::new(
            extra.sqrt_price_x96,
            extra.tick,
            extra.liquidity,
            tick_spacing,
            &extra.ticks,
        )?;

        let (tick_min, tick_max) = match (extra.ticks.first(), extra.ticks.last()) {
            (Some(first), Some(last)) => (first.index, last.index),
            _ => (MIN_TICK, MAX_TICK),
        };

        Ok(Self {
            address: record.address.to_lowercase(),
            exchange: record.exchange.clone(),
            tokens: [record.tokens[0].address, record.tokens[1].address],
            reserves: record.reserves,
            static_extra,
            extra,
            state,
            tick_min,
            tick_max,
            config: config.clone(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn tokens(&self) -> &[Address; 2] {
        &self.tokens
    }

    pub fn reserves(&self) -> &[U256; 2] {
        &self.reserves
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn token_index(&self, token: Address) -> Option<usize> {
        self.tokens.iter().position(|t| *t == token)
    }

    /// Price limit one unit inside the outermost initialized tick, so a
    /// quote never walks off the known liquidity.
    pub fn sqrt_price_limit(&self, zero_for_one: bool) -> Result<U256, Error> {
        if zero_for_one {
            Ok(get_sqrt_ratio_at_tick(self.tick_min)? + U256_1)
        } else {
            Ok(get_sqrt_ratio_at_tick(self.tick_max)? - U256_1)
        }
    }

    /// Quotes an exact-input swap of `amount_in` of `token_in`.
    pub fn calc_amount_out(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> Result<CalcAmountOutResult, Error> {
        if self.static_extra.has_controller() {
            return Err(PoolError::UnsupportedController.into());
        }

        let in_index = self
            .token_index(token_in)
            .ok_or(PoolError::InvalidToken(token_in))?;
        let out_index = self
            .token_index(token_out)
            .filter(|idx| *idx != in_index)
            .ok_or(PoolError::InvalidToken(token_out))?;
        let zero_for_one = in_index == 0;

        verify_amount_limits(amount_in)?;

        let now = self.extra.block_timestamp;
        let vars = calculate_vars(
            self.extra.dex_variables2,
            self.extra.token0_exchange_prices_and_config,
            self.extra.token1_exchange_prices_and_config,
            now,
        )?;

        let adjusted_in = vars.token(in_index).amount_to_adjusted(amount_in)?;
        verify_adjusted_amount_limits(adjusted_in)?;
        let amount_specified =
            I256::try_from(adjusted_in).map_err(|_| SwapError::AmountExceedsInt256)?;

        let schedule = FeeSchedule::for_swap(
            &DexVariables2::decode(self.extra.dex_variables2),
            self.state.sqrt_price_x96,
            zero_for_one,
            now,
        )?;
        let params = SwapParams::new(
            zero_for_one,
            amount_specified,
            self.sqrt_price_limit(zero_for_one)?,
        );
        let result = self.state.swap(params, &schedule)?;

        let remaining = result.amount_specified_remaining.unsigned_abs();
        if !remaining.is_zero() {
            return Err(PoolError::InsufficientLiquidity(remaining).into());
        }
        if result.tick < MIN_TICK || result.tick >= MAX_TICK {
            return Err(PoolError::TickOutOfBounds(result.tick).into());
        }

        let adjusted_out = result.amount_calculated.unsigned_abs();
        verify_adjusted_amount_limits(adjusted_out)?;

        let out_scale = vars.token(out_index);
        let amount_out = out_scale
            .adjusted_to_amount(adjusted_out)?
            .checked_sub(U256_1)
            .filter(|amount| !amount.is_zero())
            .ok_or(PoolError::AmountOutZero)?;
        let total_fee = result
            .lp_fee
            .checked_add(result.protocol_fee)
            .ok_or(MathError::Overflow)?;
        let fee = out_scale.adjusted_to_amount(total_fee)?;

        Ok(CalcAmountOutResult {
            amount_out,
            fee,
            gas: self.config.gas(result.crossed_initialized_ticks),
            remaining_amount_in: remaining,
            swap_info: SwapInfo {
                next_sqrt_price_x96: result.sqrt_price_x96,
                next_tick: result.tick,
                next_liquidity: result.liquidity,
                remaining_amount_in: remaining,
            },
        })
    }

    /// Moves the snapshot to the post-swap state of a previous quote.
    pub fn update_balance(&mut self, swap_info: &SwapInfo) {
        self.state.sqrt_price_x96 = swap_info.next_sqrt_price_x96;
        self.state.liquidity = swap_info.next_liquidity;
        self.state.tick = swap_info.next_tick;

        self.extra.sqrt_price_x96 = swap_info.next_sqrt_price_x96;
        self.extra.liquidity = swap_info.next_liquidity;
        self.extra.tick = swap_info.next_tick;
    }

    pub fn clone_state(&self) -> Self {
        self.clone()
    }

    pub fn get_meta_info(&self, token_in: Address) -> Result<PoolMeta, Error> {
        let in_index = self
            .token_index(token_in)
            .ok_or(PoolError::InvalidToken(token_in))?;
        Ok(PoolMeta {
            swap_fee: self.static_extra.fee,
            price_limit: self.sqrt_price_limit(in_index == 0)?,
        })
    }
}
