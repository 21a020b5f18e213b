use crate::codec::storage_slot::{address_key, uint_key};
use crate::error::PoolError;
use alloy_primitives::{Address, B256, I256, U256, hex, keccak256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `(dexId, dexType)` pair identifying one DEX v2 pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolIdentity {
    pub dex_id: B256,
    pub dex_type: u32,
}

impl PoolIdentity {
    pub const SEPARATOR: &'static str = "_d";

    pub fn new(dex_id: B256, dex_type: u32) -> Self {
        Self { dex_id, dex_type }
    }

    /// Synthetic pool address: `0x<dexId hex>_d<dexType>`.
    pub fn address(&self) -> String {
        format!(
            "0x{}{}{}",
            hex::encode(self.dex_id),
            Self::SEPARATOR,
            self.dex_type
        )
    }

    pub fn parse(address: &str) -> Result<Self, PoolError> {
        let invalid = || PoolError::InvalidAddress(address.to_string());

        let (dex_id, dex_type) = address.rsplit_once(Self::SEPARATOR).ok_or_else(invalid)?;
        let dex_id = B256::from_str(dex_id).map_err(|_| invalid())?;
        let dex_type = dex_type.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self { dex_id, dex_type })
    }
}

/// Immutable pool key announced by `LogInitialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexKey {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_spacing: u32,
    pub controller: Address,
}

impl DexKey {
    /// `keccak256(abi.encode(dexKey))`.
    pub fn dex_id(&self) -> B256 {
        let words = [
            address_key(self.token0),
            address_key(self.token1),
            uint_key(U256::from(self.fee)),
            uint_key(U256::from(self.tick_spacing)),
            address_key(self.controller),
        ];
        let mut buf = [0u8; 32 * 5];
        for (chunk, word) in buf.chunks_exact_mut(32).zip(words.iter()) {
            chunk.copy_from_slice(word.as_slice());
        }
        keccak256(buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub index: i32,
    pub liquidity_gross: U256,
    pub liquidity_net: I256,
}

impl Tick {
    pub fn new(index: i32, liquidity_gross: U256, liquidity_net: I256) -> Self {
        Self {
            index,
            liquidity_gross,
            liquidity_net,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.liquidity_gross.is_zero()
    }
}

/// Mutable pool state owned by the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extra {
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub dex_variables2: U256,
    pub token0_exchange_prices_and_config: U256,
    pub token1_exchange_prices_and_config: U256,
    /// Initialized ticks, ascending by index.
    #[serde(default)]
    pub ticks: Vec<Tick>,
    /// Packed raw reserves; moved into the pool record before persisting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserves: Option<U256>,
    #[serde(default)]
    pub block_timestamp: u64,
}

/// Pool parameters fixed at initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticExtra {
    pub dex_id: B256,
    pub dex_type: u32,
    pub fee: u32,
    pub tick_spacing: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Address>,
    #[serde(default)]
    pub is_native0: bool,
    #[serde(default)]
    pub is_native1: bool,
}

impl StaticExtra {
    pub fn identity(&self) -> PoolIdentity {
        PoolIdentity::new(self.dex_id, self.dex_type)
    }

    /// Pools behind a non-zero controller hook are not quotable.
    pub fn has_controller(&self) -> bool {
        self.controller.is_some_and(|c| !c.is_zero())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolToken {
    pub address: Address,
    pub decimals: u8,
}

/// Persisted pool entity shared by the tracker and the simulator. `extra`
/// and `static_extra` hold JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub address: String,
    pub exchange: String,
    pub tokens: [PoolToken; 2],
    pub reserves: [U256; 2],
    pub extra: String,
    pub static_extra: String,
    pub block_number: u64,
    pub timestamp: u64,
}

impl PoolRecord {
    pub fn extra(&self) -> Result<Extra, PoolError> {
        Ok(serde_json::from_str(&self.extra)?)
    }

    pub fn set_extra(&mut self, extra: &Extra) -> Result<(), PoolError> {
        self.extra = serde_json::to_string(extra)?;
        Ok(())
    }

    pub fn static_extra(&self) -> Result<StaticExtra, PoolError> {
        Ok(serde_json::from_str(&self.static_extra)?)
    }

    pub fn set_static_extra(&mut self, static_extra: &StaticExtra) -> Result<(), PoolError> {
        self.static_extra = serde_json::to_string(static_extra)?;
        Ok(())
    }

    pub fn identity(&self) -> Result<PoolIdentity, PoolError> {
        PoolIdentity::parse(&self.address)
    }
}

/// Post-swap state handed back to `update_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapInfo {
    pub next_sqrt_price_x96: U256,
    pub next_tick: i32,
    pub next_liquidity: u128,
    pub remaining_amount_in: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMeta {
    pub swap_fee: u32,
    pub price_limit: U256,
}
