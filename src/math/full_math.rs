use crate::error::MathError;
use alloy_primitives::{U256, U512};

#[inline(always)]
fn widen(x: U256) -> U512 {
    U512::from(x)
}

#[inline(always)]
fn narrow(x: U512) -> Result<U256, MathError> {
    U256::checked_from_limbs_slice(x.as_limbs()).ok_or(MathError::Overflow)
}

/// Computes `a * b / denominator` with a 512-bit intermediate product,
/// returning a `MathError` on overflow or division by zero.
///
/// Matches Solidity `FullMath.mulDiv`: the result is floored and must fit
/// in 256 bits.
#[inline(always)]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denominator);
    }

    let product = widen(a) * widen(b);
    narrow(product / widen(denominator))
}

/// Like [`mul_div`], but rounds the result up when there is a
/// non-zero remainder.
#[inline(always)]
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    let result = mul_div(a, b, denominator)?;

    if a.mul_mod(b, denominator).is_zero() {
        return Ok(result);
    }
    result.checked_add(U256::ONE).ok_or(MathError::Overflow)
}

/// Divides `a` by `b`, rounding the result up to the next integer
/// when there is a non-zero remainder.
///
/// Panics on division by zero like primitive integer division, so callers
/// must ensure `b != 0`.
#[inline(always)]
pub fn div_rounding_up(a: U256, b: U256) -> U256 {
    let (quotient, remainder) = a.div_rem(b);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::ONE
    }
}

/// Floor of the square root of a 512-bit value.
pub fn sqrt_512(x: U512) -> U512 {
    if x.is_zero() {
        return U512::ZERO;
    }

    // Newton iteration from a power of two above the root.
    let mut z = U512::ONE << ((x.bit_len() + 1) / 2);
    loop {
        let next = (z + x / z) >> 1;
        if next >= z {
            return z;
        }
        z = next;
    }
}

/// Floor of the square root of `x << shift`, evaluated without overflow.
pub fn sqrt_shifted(x: U256, shift: usize) -> Result<U256, MathError> {
    narrow(sqrt_512(widen(x) << shift))
}
