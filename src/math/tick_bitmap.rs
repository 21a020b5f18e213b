use crate::FastMap;
use crate::U256_1;
use crate::error::{MathError, StateError};
use alloy_primitives::U256;

/// Sparse map from bitmap word index to the 256-bit word of initialized
/// compressed ticks.
pub type TickBitmap = FastMap<i16, U256>;

/// Returns the index (0-255) of the most significant set bit.
pub fn most_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok((255 - x.leading_zeros()) as u8)
}

/// Returns the index (0-255) of the least significant set bit.
pub fn least_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok(x.trailing_zeros() as u8)
}

/// Maps a compressed tick into its `(word, bit)` bitmap coordinates.
pub fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

fn get_word(bitmap: &TickBitmap, word: i16) -> U256 {
    bitmap.get(&word).copied().unwrap_or_default()
}

/// Compresses a tick by the spacing, rounding towards negative infinity.
#[inline]
pub fn compress(tick: i32, tick_spacing: i32) -> i32 {
    tick.div_euclid(tick_spacing)
}

/// Toggles the initialized flag of `tick`, which must be a multiple of
/// `tick_spacing`.
pub fn flip_tick(bitmap: &mut TickBitmap, tick: i32, tick_spacing: i32) -> Result<(), StateError> {
    if tick_spacing <= 0 || tick % tick_spacing != 0 {
        return Err(StateError::TickNotAligned { tick, tick_spacing });
    }

    let (word_pos, bit_pos) = position(tick / tick_spacing);
    let word = bitmap.entry(word_pos).or_default();
    *word ^= U256_1 << bit_pos;
    Ok(())
}

/// Builds the bitmap for a set of initialized tick indexes.
#[cfg(test)]
pub(crate) fn bitmap_from_ticks<I>(ticks: I, tick_spacing: i32) -> Result<TickBitmap, StateError>
where
    I: IntoIterator<Item = i32>,
{
    let mut bitmap = TickBitmap::default();
    for tick in ticks {
        flip_tick(&mut bitmap, tick, tick_spacing)?;
    }
    bitmap.retain(|_, word| !word.is_zero());
    Ok(bitmap)
}

/// Searches the bitmap word containing `tick` for the next initialized
/// tick at or below it (`lte`) or strictly above it.
///
/// Returns the candidate tick and whether it is initialized. The candidate
/// is never further than one word away, matching the on-chain search, so
/// the swap loop reproduces the contract's per-step rounding.
pub fn next_initialized_tick_within_one_word(
    bitmap: &TickBitmap,
    tick: i32,
    tick_spacing: i32,
    lte: bool,
) -> Result<(i32, bool), MathError> {
    let compressed = compress(tick, tick_spacing);

    if lte {
        let (word_pos, bit_pos) = position(compressed);
        let mask = (U256_1 << bit_pos) - U256_1 + (U256_1 << bit_pos);
        let masked = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();
        let next = if initialized {
            (compressed - (bit_pos - most_significant_bit(masked)?) as i32) * tick_spacing
        } else {
            (compressed - bit_pos as i32) * tick_spacing
        };
        Ok((next, initialized))
    } else {
        let (word_pos, bit_pos) = position(compressed + 1);
        let mask = !((U256_1 << bit_pos) - U256_1);
        let masked = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();
        let next = if initialized {
            (compressed + 1 + (least_significant_bit(masked)? - bit_pos) as i32) * tick_spacing
        } else {
            (compressed + 1 + (u8::MAX - bit_pos) as i32) * tick_spacing
        };
        Ok((next, initialized))
    }
}
