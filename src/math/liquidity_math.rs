use crate::error::MathError;
use alloy_primitives::{I256, U256};

/// Adds a signed liquidity delta (as stored on ticks) to the active
/// liquidity, failing on underflow or when the result leaves `u128`.
pub fn add_delta(x: u128, y: I256) -> Result<u128, MathError> {
    let magnitude = y.unsigned_abs();
    let x = U256::from(x);

    let z = if y.is_negative() {
        x.checked_sub(magnitude).ok_or(MathError::Underflow)?
    } else {
        x.checked_add(magnitude).ok_or(MathError::Overflow)?
    };

    u128::try_from(z).map_err(|_| MathError::Overflow)
}
