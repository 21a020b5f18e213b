//! Decoding of the DEX v2 liquidity and initialization events.

use crate::error::TrackerError;
use crate::pool::types::{DexKey, PoolIdentity};
use alloy_primitives::{Address, B256, Bytes, I256, U256};
use alloy_sol_types::SolEvent;

pub(crate) mod abi {
    use alloy_sol_macro::sol;

    sol! {
        struct DexKey {
            address token0;
            address token1;
            uint24 fee;
            uint24 tickSpacing;
            address controller;
        }

        event LogDeposit(
            uint256 dexType,
            bytes32 dexId,
            address user,
            int24 tickLower,
            int24 tickUpper,
            bytes32 positionSalt,
            uint256 amount0,
            uint256 amount1,
            uint256 feeAccruedToken0,
            uint256 feeAccruedToken1,
            uint256 liquidityIncreaseRaw
        );

        event LogWithdraw(
            uint256 dexType,
            bytes32 dexId,
            address user,
            int24 tickLower,
            int24 tickUpper,
            bytes32 positionSalt,
            uint256 amount0,
            uint256 amount1,
            uint256 feeAccruedToken0,
            uint256 feeAccruedToken1,
            uint256 liquidityDecreaseRaw
        );

        event LogBorrow(
            uint256 dexType,
            bytes32 dexId,
            address user,
            int24 tickLower,
            int24 tickUpper,
            bytes32 positionSalt,
            uint256 amount0,
            uint256 amount1,
            uint256 feeAccruedToken0,
            uint256 feeAccruedToken1,
            uint256 liquidityIncreaseRaw
        );

        event LogPayback(
            uint256 dexType,
            bytes32 dexId,
            address user,
            int24 tickLower,
            int24 tickUpper,
            bytes32 positionSalt,
            uint256 amount0,
            uint256 amount1,
            uint256 feeAccruedToken0,
            uint256 feeAccruedToken1,
            uint256 liquidityDecreaseRaw
        );

        event LogInitialize(uint256 dexType, bytes32 dexId, DexKey dexKey, uint256 sqrtPriceX96);
    }
}

/// Transport-agnostic view of one emitted log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub log_index: u64,
    /// Set on logs of blocks dropped by a reorg.
    pub removed: bool,
}

/// Liquidity added to (`delta > 0`) or removed from a tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityChange {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity_delta: I256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    Liquidity(LiquidityChange),
    Initialize { key: DexKey, sqrt_price_x96: U256 },
}

fn decode<E: SolEvent>(log: &EventLog) -> Result<E, TrackerError> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data)
        .map_err(|e| TrackerError::EventDecode(format!("{}: {e}", E::SIGNATURE)))
}

fn is_pool(dex_type: U256, dex_id: B256, identity: &PoolIdentity) -> bool {
    dex_type == U256::from(identity.dex_type) && dex_id == identity.dex_id
}

fn signed(raw: U256, negate: bool) -> Result<I256, TrackerError> {
    let value = I256::try_from(raw)
        .map_err(|_| TrackerError::EventDecode(format!("liquidity delta {raw} exceeds int256")))?;
    Ok(if negate { -value } else { value })
}

/// Decodes `log` if it is a known event of the pool `identity`.
///
/// Logs without topics, from the zero address, with an unknown signature or
/// for another pool yield `Ok(None)`.
pub fn decode_event(log: &EventLog, identity: &PoolIdentity) -> Result<Option<PoolEvent>, TrackerError> {
    let Some(topic0) = log.topics.first() else {
        return Ok(None);
    };
    if log.address.is_zero() {
        return Ok(None);
    }

    let (dex_type, dex_id, event) = match *topic0 {
        <abi::LogDeposit as SolEvent>::SIGNATURE_HASH => {
            let e = decode::<abi::LogDeposit>(log)?;
            let delta = signed(e.liquidityIncreaseRaw, false)?;
            (e.dexType, e.dexId, liquidity(e.tickLower.as_i32(), e.tickUpper.as_i32(), delta))
        }
        <abi::LogWithdraw as SolEvent>::SIGNATURE_HASH => {
            let e = decode::<abi::LogWithdraw>(log)?;
            let delta = signed(e.liquidityDecreaseRaw, true)?;
            (e.dexType, e.dexId, liquidity(e.tickLower.as_i32(), e.tickUpper.as_i32(), delta))
        }
        <abi::LogBorrow as SolEvent>::SIGNATURE_HASH => {
            let e = decode::<abi::LogBorrow>(log)?;
            let delta = signed(e.liquidityIncreaseRaw, false)?;
            (e.dexType, e.dexId, liquidity(e.tickLower.as_i32(), e.tickUpper.as_i32(), delta))
        }
        <abi::LogPayback as SolEvent>::SIGNATURE_HASH => {
            let e = decode::<abi::LogPayback>(log)?;
            let delta = signed(e.liquidityDecreaseRaw, true)?;
            (e.dexType, e.dexId, liquidity(e.tickLower.as_i32(), e.tickUpper.as_i32(), delta))
        }
        <abi::LogInitialize as SolEvent>::SIGNATURE_HASH => {
            let e = decode::<abi::LogInitialize>(log)?;
            let key = DexKey {
                token0: e.dexKey.token0,
                token1: e.dexKey.token1,
                fee: e.dexKey.fee.to::<u32>(),
                tick_spacing: e.dexKey.tickSpacing.to::<u32>(),
                controller: e.dexKey.controller,
            };
            (
                e.dexType,
                e.dexId,
                PoolEvent::Initialize {
                    key,
                    sqrt_price_x96: e.sqrtPriceX96,
                },
            )
        }
        _ => return Ok(None),
    };

    Ok(is_pool(dex_type, dex_id, identity).then_some(event))
}

fn liquidity(tick_lower: i32, tick_upper: i32, liquidity_delta: I256) -> PoolEvent {
    PoolEvent::Liquidity(LiquidityChange {
        tick_lower,
        tick_upper,
        liquidity_delta,
    })
}

/// Liquidity change carried by `log`, if any.
pub fn liquidity_change(
    log: &EventLog,
    identity: &PoolIdentity,
) -> Result<Option<LiquidityChange>, TrackerError> {
    Ok(match decode_event(log, identity)? {
        Some(PoolEvent::Liquidity(change)) => Some(change),
        _ => None,
    })
}


#[cfg(test)]
mod tests {
    use super::test_logs::*;
    use super::*;
    use crate::Q96;
    use alloy_primitives::{address, b256};

    fn identity() -> PoolIdentity {
        PoolIdentity::new(
            b256!("0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20"),
            3,
        )
    }

    fn delta(v: i128) -> I256 {
        I256::try_from(v).unwrap()
    }

    // ---------------- liquidity events ----------------

    #[test]
    fn deposit_and_borrow_add_liquidity() {
        let id = identity();

        let change = liquidity_change(&position_log(&id, -60, 120, 500, 1, 0), &id)
            .unwrap()
            .unwrap();
        assert_eq!(
            change,
            LiquidityChange {
                tick_lower: -60,
                tick_upper: 120,
                liquidity_delta: delta(500),
            }
        );

        let change = liquidity_change(&borrow_log(&id, -600, -540, 7), &id)
            .unwrap()
            .unwrap();
        assert_eq!(change.liquidity_delta, delta(7));
        assert_eq!((change.tick_lower, change.tick_upper), (-600, -540));
    }

    #[test]
    fn withdraw_and_payback_remove_liquidity() {
        let id = identity();

        let change = liquidity_change(&position_log(&id, -60, 120, -500, 1, 0), &id)
            .unwrap()
            .unwrap();
        assert_eq!(change.liquidity_delta, delta(-500));

        let change = liquidity_change(&payback_log(&id, 0, 60, 9), &id).unwrap().unwrap();
        assert_eq!(change.liquidity_delta, delta(-9));
    }

    // ---------------- filtering ----------------

    #[test]
    fn logs_of_other_pools_are_ignored() {
        let id = identity();
        let log = position_log(&id, -60, 120, 500, 1, 0);

        let other_type = PoolIdentity::new(id.dex_id, 4);
        assert_eq!(decode_event(&log, &other_type).unwrap(), None);

        let other_id = PoolIdentity::new(B256::ZERO, id.dex_type);
        assert_eq!(decode_event(&log, &other_id).unwrap(), None);
    }

    #[test]
    fn empty_zero_address_and_unknown_logs_are_ignored() {
        let id = identity();
        let mut log = position_log(&id, -60, 120, 500, 1, 0);

        let mut no_topics = log.clone();
        no_topics.topics.clear();
        assert_eq!(decode_event(&no_topics, &id).unwrap(), None);

        let mut zero_address = log.clone();
        zero_address.address = Address::ZERO;
        assert_eq!(decode_event(&zero_address, &id).unwrap(), None);

        log.topics[0] = B256::repeat_byte(0xab);
        assert_eq!(decode_event(&log, &id).unwrap(), None);
    }

    #[test]
    fn truncated_data_is_a_decode_error() {
        let id = identity();
        let mut log = position_log(&id, -60, 120, 500, 1, 0);
        log.data = Bytes::from(log.data[..64].to_vec());
        assert!(matches!(
            decode_event(&log, &id),
            Err(TrackerError::EventDecode(_))
        ));
    }

    // ---------------- initialize ----------------

    #[test]
    fn initialize_carries_the_dex_key() {
        let key = DexKey {
            token0: address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            token1: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            fee: 3_000,
            tick_spacing: 60,
            controller: Address::ZERO,
        };
        let id = PoolIdentity::new(key.dex_id(), 3);
        let log = initialize_log(&id, &key, Q96);

        assert_eq!(
            decode_event(&log, &id).unwrap(),
            Some(PoolEvent::Initialize {
                key,
                sqrt_price_x96: Q96,
            })
        );
        assert_eq!(liquidity_change(&log, &id).unwrap(), None);
    }
}
