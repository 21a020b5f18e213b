//! Solidity storage-slot derivation for the DEX v2 tick mappings.

use alloy_primitives::{Address, B256, U256, keccak256};

/// Base slot of `mapping(dexType => mapping(dexId => mapping(tick => tickData)))`.
pub const DEX_V2_TICK_DATA_MAPPING_SLOT: u64 = 6;
/// Base slot of the per-tick gross liquidity mapping, keyed like tick data.
pub const DEX_V2_TICK_LIQUIDITY_GROSS_MAPPING_SLOT: u64 = 7;

/// `uint256` key, 32 bytes big-endian.
#[inline]
pub fn uint_key(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Signed key (`int24` ticks), sign-extended to 32 bytes.
#[inline]
pub fn int_key(value: i32) -> B256 {
    let word = if value < 0 {
        !U256::from(!value as u32)
    } else {
        U256::from(value as u32)
    };
    uint_key(word)
}

/// `address` key, left-padded to 32 bytes.
#[inline]
pub fn address_key(value: Address) -> B256 {
    value.into_word()
}

/// `keccak256(key ‖ slot)`.
pub fn mapping_slot(key: B256, slot: B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(key.as_slice());
    buf[32..].copy_from_slice(slot.as_slice());
    keccak256(buf)
}

/// Slot of `m[key1][key2]` for the nested mapping `m` at `slot`.
pub fn double_mapping_slot(key1: B256, key2: B256, slot: B256) -> B256 {
    mapping_slot(key2, mapping_slot(key1, slot))
}

/// Slot of `m[key1][key2][key3]` for the nested mapping `m` at `slot`.
pub fn triple_mapping_slot(key1: B256, key2: B256, key3: B256, slot: B256) -> B256 {
    mapping_slot(key3, double_mapping_slot(key1, key2, slot))
}

fn tick_slot(base: u64, dex_type: u32, dex_id: B256, tick: i32) -> B256 {
    triple_mapping_slot(
        uint_key(U256::from(dex_type)),
        dex_id,
        int_key(tick),
        uint_key(U256::from(base)),
    )
}

/// Slot holding the tick's packed data; `liquidityNet` is read from it as a
/// two's-complement `int256`.
pub fn tick_data_slot(dex_type: u32, dex_id: B256, tick: i32) -> B256 {
    tick_slot(DEX_V2_TICK_DATA_MAPPING_SLOT, dex_type, dex_id, tick)
}

/// Slot holding the tick's gross liquidity.
pub fn tick_liquidity_gross_slot(dex_type: u32, dex_id: B256, tick: i32) -> B256 {
    tick_slot(DEX_V2_TICK_LIQUIDITY_GROSS_MAPPING_SLOT, dex_type, dex_id, tick)
}
