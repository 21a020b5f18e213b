use crate::error::StateError;
use alloy_primitives::{I256, U256};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

const SQRT_10001: I256 = I256::from_raw(U256::from_limbs([11745905768312294533, 13863, 0, 0]));
const TICK_LOW: I256 = I256::from_raw(U256::from_limbs([
    6552757943157144234,
    184476617836266586,
    0,
    0,
]));
const TICK_HIGH: I256 = I256::from_raw(U256::from_limbs([
    4998474450511881007,
    15793544031827761793,
    0,
    0,
]));

/// `1 / sqrt(1.0001)^(2^i)` in Q128, for bits 1..=19 of the absolute tick.
const RATIO_MULTIPLIERS: [(u32, u64, u64); 19] = [
    (0x2, 6459403834229662010, 18444899583751176498),
    (0x4, 17226890335427755468, 18443055278223354162),
    (0x8, 2032852871939366096, 18439367220385604838),
    (0x10, 14545316742740207172, 18431993317065449817),
    (0x20, 5129152022828963008, 18417254355718160513),
    (0x40, 4894419605888772193, 18387811781193591352),
    (0x80, 1280255884321894483, 18329067761203520168),
    (0x100, 15924666964335305636, 18212142134806087854),
    (0x200, 8010504389359918676, 17980523815641551639),
    (0x400, 10668036004952895731, 17526086738831147013),
    (0x800, 4878133418470705625, 16651378430235024244),
    (0x1000, 9537173718739605541, 15030750278693429944),
    (0x2000, 9972618978014552549, 12247334978882834399),
    (0x4000, 10428997489610666743, 8131365268884726200),
    (0x8000, 9305304367709015974, 3584323654723342297),
    (0x10000, 14301143598189091785, 696457651847595233),
    (0x20000, 7393154844743099908, 26294789957452057),
    (0x40000, 2209338891292245656, 37481735321082),
    (0x80000, 10518117631919034274, 76158723),
];

/// Returns the sqrt price (Q64.96) at a given tick, or
/// `StateError::TickOutOfBounds` outside `[MIN_TICK, MAX_TICK]`.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, StateError> {
    let abs_tick = tick.unsigned_abs();

    if abs_tick > MAX_TICK as u32 {
        return Err(StateError::TickOutOfBounds);
    }

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737, 18445821805675392311, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    for &(bit, lo, hi) in RATIO_MULTIPLIERS.iter() {
        if abs_tick & bit != 0 {
            ratio = ratio.wrapping_mul(U256::from_limbs([lo, hi, 0, 0])) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up.
    let round_up = !(ratio & U256::from(u32::MAX)).is_zero();
    Ok((ratio >> 32) + U256::from(round_up as u8))
}

/// Computes the greatest tick whose sqrt price is at most `sqrt_price_x96`.
///
/// Follows the Solidity log2 approximation: 14 fractional bits of
/// `log2(ratio)` followed by a single boundary check.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> Result<i32, StateError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(StateError::SqrtPriceOutOfBounds);
    }

    let ratio: U256 = sqrt_price_x96 << 32;
    let msb = 255 - ratio.leading_zeros();

    let mut r = if msb >= 128 {
        ratio >> (msb - 127)
    } else {
        ratio << (127 - msb)
    };

    let mut log_2: I256 = I256::try_from(msb as i64 - 128)
        .map_err(|_| StateError::SqrtPriceOutOfBounds)?
        << 64;

    for shift in (50..=63).rev() {
        r = r.wrapping_mul(r) >> 127;
        let f: U256 = r >> 128;
        log_2 |= I256::from_raw(f << shift);
        r >>= f.to::<usize>();
    }

    let log_sqrt10001 = log_2.wrapping_mul(SQRT_10001);
    let tick_low = (log_sqrt10001 - TICK_LOW).asr(128).low_i32();
    let tick_high = (log_sqrt10001 + TICK_HIGH).asr(128).low_i32();

    Ok(if tick_low == tick_high {
        tick_low
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price_x96 {
        tick_high
    } else {
        tick_low
    })
}
