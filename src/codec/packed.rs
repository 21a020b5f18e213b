//! Bit-packed storage words of the Fluid liquidity layer and DEX v2.
//!
//! Every on-chain word packs several fixed-width sub-fields. The layouts
//! below are decoded into plain structs; `encode` is the inverse and is
//! mostly useful for fixtures.

use crate::error::{MathError, PoolError};
use crate::math::full_math::mul_div;
use crate::{U256_E4, U256_1};
use alloy_primitives::U256;

pub const EXCHANGE_PRICES_PRECISION: U256 = U256::from_limbs([1_000_000_000_000, 0, 0, 0]);
pub const TOKENS_DECIMALS_PRECISION: u8 = 9;
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

pub const X15: u64 = (1 << 15) - 1;
pub const X86: U256 = U256::from_limbs([u64::MAX, (1 << 22) - 1, 0, 0]);
pub const X128: U256 = U256::from_limbs([u64::MAX, u64::MAX, 0, 0]);

// exchangePricesAndConfig
pub const BITS_EXCHANGE_PRICES_BORROW_RATE: usize = 0;
pub const BITS_EXCHANGE_PRICES_FEE: usize = 16;
pub const BITS_EXCHANGE_PRICES_UTILIZATION: usize = 30;
pub const BITS_EXCHANGE_PRICES_UPDATE_THRESHOLD: usize = 44;
pub const BITS_EXCHANGE_PRICES_LAST_TIMESTAMP: usize = 58;
pub const BITS_EXCHANGE_PRICES_SUPPLY_EXCHANGE_PRICE: usize = 91;
pub const BITS_EXCHANGE_PRICES_BORROW_EXCHANGE_PRICE: usize = 155;
pub const BITS_EXCHANGE_PRICES_SUPPLY_RATIO: usize = 219;
pub const BITS_EXCHANGE_PRICES_BORROW_RATIO: usize = 234;

// dexVariables2
pub const BITS_DEX_V2_VARIABLES2_FEE_VERSION: usize = 0;
pub const BITS_DEX_V2_VARIABLES2_PROTOCOL_FEE_0_TO_1: usize = 1;
pub const BITS_DEX_V2_VARIABLES2_PROTOCOL_FEE_1_TO_0: usize = 13;
pub const BITS_DEX_V2_VARIABLES2_LP_FEE: usize = 25;
pub const BITS_DEX_V2_VARIABLES2_MIN_FEE: usize = 41;
pub const BITS_DEX_V2_VARIABLES2_MAX_FEE: usize = 57;
pub const BITS_DEX_V2_VARIABLES2_PRICE_IMPACT_TO_FEE_DIVISION_FACTOR: usize = 73;
pub const BITS_DEX_V2_VARIABLES2_NET_PRICE_IMPACT_SIGN: usize = 81;
pub const BITS_DEX_V2_VARIABLES2_ABSOLUTE_NET_PRICE_IMPACT: usize = 82;
pub const BITS_DEX_V2_VARIABLES2_LAST_UPDATE_TIMESTAMP: usize = 102;
pub const BITS_DEX_V2_VARIABLES2_DECAY_TIME_REMAINING: usize = 117;
pub const BITS_DEX_V2_VARIABLES2_TOKEN_0_DECIMALS: usize = 129;
pub const BITS_DEX_V2_VARIABLES2_TOKEN_1_DECIMALS: usize = 133;

// tokenReserves
pub const BITS_DEX_V2_TOKEN_RESERVES_TOKEN_0_RESERVES: usize = 0;
pub const BITS_DEX_V2_TOKEN_RESERVES_TOKEN_1_RESERVES: usize = 128;

/// Reads `width` bits of `word` starting at `offset`.
#[inline]
pub fn extract(word: U256, offset: usize, width: usize) -> U256 {
    (word >> offset) & ((U256_1 << width) - U256_1)
}

#[inline]
fn extract_u64(word: U256, offset: usize, width: usize) -> u64 {
    debug_assert!(width <= 64);
    extract(word, offset, width).to::<u64>()
}

#[inline]
fn insert(word: &mut U256, value: U256, offset: usize, width: usize) {
    let mask = ((U256_1 << width) - U256_1) << offset;
    *word = (*word & !mask) | ((value << offset) & mask);
}

/// Decoded `exchangePricesAndConfig` word of one token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangePricesAndConfig {
    pub borrow_rate: u64,
    pub fee: u64,
    pub utilization: u64,
    pub update_threshold: u64,
    pub last_timestamp: u64,
    pub supply_exchange_price: u64,
    pub borrow_exchange_price: u64,
    pub supply_ratio: u64,
    pub borrow_ratio: u64,
}

impl ExchangePricesAndConfig {
    pub fn decode(word: U256) -> Self {
        Self {
            borrow_rate: extract_u64(word, BITS_EXCHANGE_PRICES_BORROW_RATE, 16),
            fee: extract_u64(word, BITS_EXCHANGE_PRICES_FEE, 14),
            utilization: extract_u64(word, BITS_EXCHANGE_PRICES_UTILIZATION, 14),
            update_threshold: extract_u64(word, BITS_EXCHANGE_PRICES_UPDATE_THRESHOLD, 14),
            last_timestamp: extract_u64(word, BITS_EXCHANGE_PRICES_LAST_TIMESTAMP, 33),
            supply_exchange_price: extract_u64(word, BITS_EXCHANGE_PRICES_SUPPLY_EXCHANGE_PRICE, 64),
            borrow_exchange_price: extract_u64(word, BITS_EXCHANGE_PRICES_BORROW_EXCHANGE_PRICE, 64),
            supply_ratio: extract_u64(word, BITS_EXCHANGE_PRICES_SUPPLY_RATIO, 15),
            borrow_ratio: extract_u64(word, BITS_EXCHANGE_PRICES_BORROW_RATIO, 15),
        }
    }

    pub fn encode(&self) -> U256 {
        let mut word = U256::ZERO;
        for (value, offset, width) in [
            (self.borrow_rate, BITS_EXCHANGE_PRICES_BORROW_RATE, 16),
            (self.fee, BITS_EXCHANGE_PRICES_FEE, 14),
            (self.utilization, BITS_EXCHANGE_PRICES_UTILIZATION, 14),
            (self.update_threshold, BITS_EXCHANGE_PRICES_UPDATE_THRESHOLD, 14),
            (self.last_timestamp, BITS_EXCHANGE_PRICES_LAST_TIMESTAMP, 33),
            (self.supply_exchange_price, BITS_EXCHANGE_PRICES_SUPPLY_EXCHANGE_PRICE, 64),
            (self.borrow_exchange_price, BITS_EXCHANGE_PRICES_BORROW_EXCHANGE_PRICE, 64),
            (self.supply_ratio, BITS_EXCHANGE_PRICES_SUPPLY_RATIO, 15),
            (self.borrow_ratio, BITS_EXCHANGE_PRICES_BORROW_RATIO, 15),
        ] {
            insert(&mut word, U256::from(value), offset, width);
        }
        word
    }
}

/// Supply and borrow exchange prices of a token, in 1e12 precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangePrices {
    pub supply: U256,
    pub borrow: U256,
}

/// Derives the current exchange prices from a packed word at time `now`.
///
/// The borrow price accrues interest since the last update. The supply
/// price is returned as stored when no accrual applies; when the supply
/// side would need an interest adjustment the quote fails closed.
pub fn calc_exchange_price(word: U256, now: u64) -> Result<ExchangePrices, PoolError> {
    let config = ExchangePricesAndConfig::decode(word);

    if config.supply_exchange_price == 0 || config.borrow_exchange_price == 0 {
        return Err(PoolError::LiquidityCalcs);
    }

    let supply = U256::from(config.supply_exchange_price);
    let mut borrow = U256::from(config.borrow_exchange_price);

    let seconds_since_update = now.saturating_sub(config.last_timestamp);
    if seconds_since_update == 0 || config.borrow_rate == 0 || config.borrow_ratio == 1 {
        return Ok(ExchangePrices { supply, borrow });
    }

    let increase = borrow
        * U256::from(config.borrow_rate)
        * U256::from(seconds_since_update)
        / (U256::from(SECONDS_PER_YEAR) * U256_E4);
    borrow += increase;

    if config.supply_ratio == 1 {
        return Ok(ExchangePrices { supply, borrow });
    }

    Err(PoolError::SupplyExchangePriceAdjustmentUnsupported)
}

/// Decoded `dexVariables2` word: fee configuration, dynamic-fee state and
/// token decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DexVariables2 {
    pub fee_version: u8,
    pub protocol_fee_0_to_1: u32,
    pub protocol_fee_1_to_0: u32,
    pub lp_fee: u32,
    pub min_fee: u32,
    pub max_fee: u32,
    pub price_impact_to_fee_division_factor: u32,
    pub net_price_impact_positive: bool,
    pub absolute_net_price_impact: u32,
    pub last_update_timestamp: u32,
    pub decay_time_remaining: u32,
    pub token0_decimals: u8,
    pub token1_decimals: u8,
}

impl DexVariables2 {
    pub fn decode(word: U256) -> Self {
        let field = |offset, width| extract_u64(word, offset, width) as u32;
        Self {
            fee_version: field(BITS_DEX_V2_VARIABLES2_FEE_VERSION, 1) as u8,
            protocol_fee_0_to_1: field(BITS_DEX_V2_VARIABLES2_PROTOCOL_FEE_0_TO_1, 12),
            protocol_fee_1_to_0: field(BITS_DEX_V2_VARIABLES2_PROTOCOL_FEE_1_TO_0, 12),
            lp_fee: field(BITS_DEX_V2_VARIABLES2_LP_FEE, 16),
            min_fee: field(BITS_DEX_V2_VARIABLES2_MIN_FEE, 16),
            max_fee: field(BITS_DEX_V2_VARIABLES2_MAX_FEE, 16),
            price_impact_to_fee_division_factor: field(
                BITS_DEX_V2_VARIABLES2_PRICE_IMPACT_TO_FEE_DIVISION_FACTOR,
                8,
            ),
            net_price_impact_positive: field(BITS_DEX_V2_VARIABLES2_NET_PRICE_IMPACT_SIGN, 1) == 1,
            absolute_net_price_impact: field(BITS_DEX_V2_VARIABLES2_ABSOLUTE_NET_PRICE_IMPACT, 20),
            last_update_timestamp: field(BITS_DEX_V2_VARIABLES2_LAST_UPDATE_TIMESTAMP, 15),
            decay_time_remaining: field(BITS_DEX_V2_VARIABLES2_DECAY_TIME_REMAINING, 12),
            token0_decimals: field(BITS_DEX_V2_VARIABLES2_TOKEN_0_DECIMALS, 4) as u8,
            token1_decimals: field(BITS_DEX_V2_VARIABLES2_TOKEN_1_DECIMALS, 4) as u8,
        }
    }

    pub fn encode(&self) -> U256 {
        let mut word = U256::ZERO;
        for (value, offset, width) in [
            (self.fee_version as u64, BITS_DEX_V2_VARIABLES2_FEE_VERSION, 1),
            (self.protocol_fee_0_to_1 as u64, BITS_DEX_V2_VARIABLES2_PROTOCOL_FEE_0_TO_1, 12),
            (self.protocol_fee_1_to_0 as u64, BITS_DEX_V2_VARIABLES2_PROTOCOL_FEE_1_TO_0, 12),
            (self.lp_fee as u64, BITS_DEX_V2_VARIABLES2_LP_FEE, 16),
            (self.min_fee as u64, BITS_DEX_V2_VARIABLES2_MIN_FEE, 16),
            (self.max_fee as u64, BITS_DEX_V2_VARIABLES2_MAX_FEE, 16),
            (
                self.price_impact_to_fee_division_factor as u64,
                BITS_DEX_V2_VARIABLES2_PRICE_IMPACT_TO_FEE_DIVISION_FACTOR,
                8,
            ),
            (
                self.net_price_impact_positive as u64,
                BITS_DEX_V2_VARIABLES2_NET_PRICE_IMPACT_SIGN,
                1,
            ),
            (
                self.absolute_net_price_impact as u64,
                BITS_DEX_V2_VARIABLES2_ABSOLUTE_NET_PRICE_IMPACT,
                20,
            ),
            (
                self.last_update_timestamp as u64,
                BITS_DEX_V2_VARIABLES2_LAST_UPDATE_TIMESTAMP,
                15,
            ),
            (
                self.decay_time_remaining as u64,
                BITS_DEX_V2_VARIABLES2_DECAY_TIME_REMAINING,
                12,
            ),
            (self.token0_decimals as u64, BITS_DEX_V2_VARIABLES2_TOKEN_0_DECIMALS, 4),
            (self.token1_decimals as u64, BITS_DEX_V2_VARIABLES2_TOKEN_1_DECIMALS, 4),
        ] {
            insert(&mut word, U256::from(value), offset, width);
        }
        word
    }

    /// Constant-fee (legacy) pools charge `lp_fee` on every step.
    pub fn is_constant_fee(&self) -> bool {
        self.fee_version == 0 || self.price_impact_to_fee_division_factor == 0
    }

    pub fn protocol_fee(&self, zero_for_one: bool) -> u32 {
        if zero_for_one {
            self.protocol_fee_0_to_1
        } else {
            self.protocol_fee_1_to_0
        }
    }
}

/// Expands the 4-bit decimals field; 15 encodes 18 decimals.
pub fn unpack_decimals(raw: u8) -> u8 {
    if raw == 15 { 18 } else { raw }
}

/// `(numerator, denominator)` scaling a token amount to 9 internal decimals.
pub fn decimals_precision(decimals: u8) -> (U256, U256) {
    if decimals > TOKENS_DECIMALS_PRECISION {
        (
            U256_1,
            U256::from(10u64).pow(U256::from(decimals - TOKENS_DECIMALS_PRECISION)),
        )
    } else {
        (
            U256::from(10u64).pow(U256::from(TOKENS_DECIMALS_PRECISION - decimals)),
            U256_1,
        )
    }
}

/// Per-token scaling between natural token units and adjusted engine units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenScale {
    pub numerator_precision: U256,
    pub denominator_precision: U256,
    pub supply_exchange_price: U256,
    pub borrow_exchange_price: U256,
}

impl TokenScale {
    /// `amount * 1e12 * numerator / (supplyExchangePrice * denominator)`, floored.
    pub fn amount_to_adjusted(&self, amount: U256) -> Result<U256, MathError> {
        let numerator = EXCHANGE_PRICES_PRECISION
            .checked_mul(self.numerator_precision)
            .ok_or(MathError::Overflow)?;
        let denominator = self
            .supply_exchange_price
            .checked_mul(self.denominator_precision)
            .ok_or(MathError::Overflow)?;
        mul_div(amount, numerator, denominator)
    }

    /// `adjusted * denominator * supplyExchangePrice / (numerator * 1e12)`, floored.
    pub fn adjusted_to_amount(&self, adjusted: U256) -> Result<U256, MathError> {
        let numerator = self
            .denominator_precision
            .checked_mul(self.supply_exchange_price)
            .ok_or(MathError::Overflow)?;
        let denominator = self
            .numerator_precision
            .checked_mul(EXCHANGE_PRICES_PRECISION)
            .ok_or(MathError::Overflow)?;
        mul_div(adjusted, numerator, denominator)
    }
}

/// Scaling of both pool tokens at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatedVars {
    pub token0: TokenScale,
    pub token1: TokenScale,
}

impl CalculatedVars {
    pub fn token(&self, index: usize) -> &TokenScale {
        if index == 0 { &self.token0 } else { &self.token1 }
    }
}

/// Builds both token scales from the pool words at time `now`.
pub fn calculate_vars(
    dex_variables2: U256,
    token0_exchange_prices_and_config: U256,
    token1_exchange_prices_and_config: U256,
    now: u64,
) -> Result<CalculatedVars, PoolError> {
    let vars = DexVariables2::decode(dex_variables2);

    let scale = |raw_decimals: u8, word: U256| -> Result<TokenScale, PoolError> {
        let (numerator_precision, denominator_precision) =
            decimals_precision(unpack_decimals(raw_decimals));
        let prices = calc_exchange_price(word, now)?;
        Ok(TokenScale {
            numerator_precision,
            denominator_precision,
            supply_exchange_price: prices.supply,
            borrow_exchange_price: prices.borrow,
        })
    };

    Ok(CalculatedVars {
        token0: scale(vars.token0_decimals, token0_exchange_prices_and_config)?,
        token1: scale(vars.token1_decimals, token1_exchange_prices_and_config)?,
    })
}

/// Splits the packed reserves word into `(token0, token1)` raw reserves.
pub fn extract_token_reserves(word: U256) -> (U256, U256) {
    (
        extract(word, BITS_DEX_V2_TOKEN_RESERVES_TOKEN_0_RESERVES, 128),
        extract(word, BITS_DEX_V2_TOKEN_RESERVES_TOKEN_1_RESERVES, 128),
    )
}

/// Natural-unit amounts must lie in `[1e4, 2^128 - 1]`.
pub fn verify_amount_limits(amount: U256) -> Result<(), PoolError> {
    if amount < U256_E4 || amount > X128 {
        return Err(PoolError::AmountOutOfLimits);
    }
    Ok(())
}

/// Adjusted amounts must lie in `[1e4, 2^86 - 1]`.
pub fn verify_adjusted_amount_limits(amount: U256) -> Result<(), PoolError> {
    if amount < U256_E4 || amount > X86 {
        return Err(PoolError::AdjustedAmountOutOfLimits);
    }
    Ok(())
}
