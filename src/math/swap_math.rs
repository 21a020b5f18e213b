use crate::codec::packed::DexVariables2;
use crate::error::{Error, MathError, SwapError};
use crate::math::dynamic_fee::{DynamicFeeVariables, FEE_PRECISION};
use crate::math::full_math::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta, get_amount_1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use crate::U256_E6;
use alloy_primitives::{I256, U256};

/// Result of moving the price within a single liquidity range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_price_next_x96: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Input taken as fee. With a zero fee this is the rounding dust of an
    /// exact-input step that stops short of its target.
    pub fee_amount: U256,
}

/// Computes one swap step from `sqrt_price_current_x96` towards
/// `sqrt_price_target_x96`, with the fee taken from the input.
///
/// A positive `amount_remaining` is an exact-input amount, a negative one an
/// exact-output amount. The direction is inferred from the two prices.
pub fn compute_swap_step(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<SwapStep, Error> {
    let zero_for_one = sqrt_price_current_x96 >= sqrt_price_target_x96;
    let exact_in = !amount_remaining.is_negative();
    let remaining_abs = amount_remaining.unsigned_abs();

    let sqrt_price_next_x96;
    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    if exact_in {
        let remaining_less_fee = mul_div(
            remaining_abs,
            U256::from(FEE_PRECISION - fee_pips),
            U256_E6,
        )?;
        amount_in = if zero_for_one {
            get_amount_0_delta(sqrt_price_target_x96, sqrt_price_current_x96, liquidity, true)?
        } else {
            get_amount_1_delta(sqrt_price_current_x96, sqrt_price_target_x96, liquidity, true)?
        };
        sqrt_price_next_x96 = if remaining_less_fee >= amount_in {
            sqrt_price_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_price_current_x96,
                liquidity,
                remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        amount_out = if zero_for_one {
            get_amount_1_delta(sqrt_price_target_x96, sqrt_price_current_x96, liquidity, false)?
        } else {
            get_amount_0_delta(sqrt_price_current_x96, sqrt_price_target_x96, liquidity, false)?
        };
        sqrt_price_next_x96 = if remaining_abs >= amount_out {
            sqrt_price_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_price_current_x96,
                liquidity,
                remaining_abs,
                zero_for_one,
            )?
        };
    }

    let max = sqrt_price_target_x96 == sqrt_price_next_x96;

    if zero_for_one {
        if !(max && exact_in) {
            amount_in =
                get_amount_0_delta(sqrt_price_next_x96, sqrt_price_current_x96, liquidity, true)?;
        }
        if !(max && !exact_in) {
            amount_out =
                get_amount_1_delta(sqrt_price_next_x96, sqrt_price_current_x96, liquidity, false)?;
        }
    } else {
        if !(max && exact_in) {
            amount_in =
                get_amount_1_delta(sqrt_price_current_x96, sqrt_price_next_x96, liquidity, true)?;
        }
        if !(max && !exact_in) {
            amount_out =
                get_amount_0_delta(sqrt_price_current_x96, sqrt_price_next_x96, liquidity, false)?;
        }
    }

    if !exact_in && amount_out > remaining_abs {
        amount_out = remaining_abs;
    }

    let fee_amount = if exact_in && sqrt_price_next_x96 != sqrt_price_target_x96 {
        remaining_abs.saturating_sub(amount_in)
    } else {
        mul_div_rounding_up(amount_in, U256::from(fee_pips), U256::from(FEE_PRECISION - fee_pips))?
    };

    Ok(SwapStep {
        sqrt_price_next_x96,
        amount_in,
        amount_out,
        fee_amount,
    })
}

/// Fee-free step: the pure geometric move the pool's liquidity allows.
#[inline]
pub fn compute_swap_step_without_fee(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
) -> Result<SwapStep, Error> {
    compute_swap_step(
        sqrt_price_current_x96,
        sqrt_price_target_x96,
        liquidity,
        amount_remaining,
        0,
    )
}

/// Split of a gross output amount into what the trader receives and the
/// two fee components. `net + lp_fee + protocol_fee == gross` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFees {
    pub net: U256,
    pub lp_fee: U256,
    pub protocol_fee: U256,
}

/// Takes the protocol fee from `gross`, then the LP fee from what is left.
pub fn apply_output_fees(
    gross: U256,
    protocol_fee_pips: u32,
    lp_fee_pips: u32,
) -> Result<OutputFees, MathError> {
    let protocol_fee = mul_div(gross, U256::from(protocol_fee_pips), U256_E6)?;
    let after_protocol = gross.checked_sub(protocol_fee).ok_or(MathError::Underflow)?;
    let lp_fee = mul_div(after_protocol, U256::from(lp_fee_pips), U256_E6)?;
    let net = after_protocol.checked_sub(lp_fee).ok_or(MathError::Underflow)?;

    Ok(OutputFees {
        net,
        lp_fee,
        protocol_fee,
    })
}

/// How the LP fee of a swap is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSchedule {
    Constant { lp_fee: u32, protocol_fee: u32 },
    Dynamic {
        protocol_fee: u32,
        vars: DynamicFeeVariables,
    },
}

impl FeeSchedule {
    /// Schedule for a swap starting at `sqrt_price_x96` in the given direction.
    pub fn for_swap(
        vars: &DexVariables2,
        sqrt_price_x96: U256,
        zero_for_one: bool,
        now: u64,
    ) -> Result<Self, Error> {
        let protocol_fee = vars.protocol_fee(zero_for_one);
        if vars.is_constant_fee() {
            return Ok(FeeSchedule::Constant {
                lp_fee: vars.lp_fee,
                protocol_fee,
            });
        }
        Ok(FeeSchedule::Dynamic {
            protocol_fee,
            vars: DynamicFeeVariables::derive(sqrt_price_x96, zero_for_one, vars, now)?,
        })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, FeeSchedule::Dynamic { .. })
    }
}

/// One step of a swap with fees applied.
///
/// Exact input: `amount_in` is the input consumed from the remaining
/// amount, `amount_out` the net output after fees, and fees are in the
/// output token.
///
/// Exact output: `amount_out` is the output leaving the pool and
/// `amount_in` the input owed including fees, which are in the input
/// token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeStep {
    pub sqrt_price_next_x96: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    pub lp_fee: U256,
    pub protocol_fee: U256,
}

impl FeeStep {
    fn accumulate(&mut self, consumed: U256, fees: OutputFees) -> Result<(), MathError> {
        self.amount_in = self.amount_in.checked_add(consumed).ok_or(MathError::Overflow)?;
        self.amount_out = self.amount_out.checked_add(fees.net).ok_or(MathError::Overflow)?;
        self.lp_fee = self.lp_fee.checked_add(fees.lp_fee).ok_or(MathError::Overflow)?;
        self.protocol_fee = self
            .protocol_fee
            .checked_add(fees.protocol_fee)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }
}

fn ensure_int256(step: &SwapStep) -> Result<(), SwapError> {
    let ceiling = I256::MAX.into_raw();
    if step.amount_in > ceiling || step.amount_out > ceiling || step.fee_amount > ceiling {
        return Err(SwapError::AmountExceedsInt256);
    }
    Ok(())
}

/// Computes one range step with the pool's fee schedule applied.
pub fn compute_swap_step_with_fees(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    schedule: &FeeSchedule,
) -> Result<FeeStep, Error> {
    match *schedule {
        FeeSchedule::Constant {
            lp_fee,
            protocol_fee,
        } => {
            if amount_remaining.is_negative() {
                constant_fee_exact_output_step(
                    sqrt_price_current_x96,
                    sqrt_price_target_x96,
                    liquidity,
                    amount_remaining,
                    lp_fee,
                    protocol_fee,
                )
            } else {
                let step = compute_swap_step_without_fee(
                    sqrt_price_current_x96,
                    sqrt_price_target_x96,
                    liquidity,
                    amount_remaining,
                )?;
                ensure_int256(&step)?;

                let mut out = FeeStep {
                    sqrt_price_next_x96: step.sqrt_price_next_x96,
                    ..Default::default()
                };
                out.accumulate(
                    step.amount_in + step.fee_amount,
                    apply_output_fees(step.amount_out, protocol_fee, lp_fee)?,
                )?;
                Ok(out)
            }
        }
        FeeSchedule::Dynamic { protocol_fee, vars } => {
            if amount_remaining.is_negative() {
                return Err(SwapError::ExactOutputWithDynamicFee.into());
            }
            dynamic_fee_exact_input_step(
                sqrt_price_current_x96,
                sqrt_price_target_x96,
                liquidity,
                amount_remaining,
                protocol_fee,
                &vars,
            )
        }
    }
}

/// Exact output with a constant fee: the output is fixed by the geometry,
/// the input is grossed up by the LP fee and then the protocol fee.
fn constant_fee_exact_output_step(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    lp_fee: u32,
    protocol_fee: u32,
) -> Result<FeeStep, Error> {
    let step = compute_swap_step_without_fee(
        sqrt_price_current_x96,
        sqrt_price_target_x96,
        liquidity,
        amount_remaining,
    )?;
    ensure_int256(&step)?;

    let with_lp_fee = mul_div(
        step.amount_in,
        U256_E6,
        U256::from(FEE_PRECISION - lp_fee),
    )?;
    let total = mul_div(
        with_lp_fee,
        U256_E6,
        U256::from(FEE_PRECISION - protocol_fee),
    )?;

    Ok(FeeStep {
        sqrt_price_next_x96: step.sqrt_price_next_x96,
        amount_in: total,
        amount_out: step.amount_out,
        lp_fee: with_lp_fee - step.amount_in,
        protocol_fee: total - with_lp_fee,
    })
}

/// Exact input through up to three fee segments: `min_fee` until the
/// min-fee kink, a fee taken at the segment's mean price until the max-fee
/// kink, and `max_fee` beyond it.
fn dynamic_fee_exact_input_step(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    protocol_fee: u32,
    vars: &DynamicFeeVariables,
) -> Result<FeeStep, Error> {
    let zero_for_one = sqrt_price_current_x96 >= sqrt_price_target_x96;
    let kinks = [
        vars.min_fee_kink_sqrt_price_x96,
        vars.max_fee_kink_sqrt_price_x96,
    ];

    let mut out = FeeStep::default();
    let mut sqrt_price = sqrt_price_current_x96;
    let mut remaining = amount_remaining;

    for segment in 0..3 {
        if remaining.is_zero() || sqrt_price == sqrt_price_target_x96 {
            break;
        }

        let segment_end = match kinks.get(segment) {
            Some(&kink) => {
                let ahead = if zero_for_one {
                    kink < sqrt_price
                } else {
                    kink > sqrt_price
                };
                if !ahead {
                    continue;
                }
                if zero_for_one {
                    kink.max(sqrt_price_target_x96)
                } else {
                    kink.min(sqrt_price_target_x96)
                }
            }
            None => sqrt_price_target_x96,
        };

        let step = compute_swap_step_without_fee(sqrt_price, segment_end, liquidity, remaining)?;
        ensure_int256(&step)?;

        let lp_fee = match segment {
            0 => vars.min_fee,
            1 => vars.fee_between(sqrt_price, step.sqrt_price_next_x96)?,
            _ => vars.max_fee,
        };

        let consumed = step.amount_in + step.fee_amount;
        out.accumulate(consumed, apply_output_fees(step.amount_out, protocol_fee, lp_fee)?)?;

        remaining -= I256::from_raw(consumed);
        sqrt_price = step.sqrt_price_next_x96;
    }

    out.sqrt_price_next_x96 = sqrt_price;
    Ok(out)
}
