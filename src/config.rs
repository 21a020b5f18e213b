use crate::error::Error;
use alloy_primitives::Address;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "FLUID_DEX_V2_";

pub const DEFAULT_TICK_CHUNK_SIZE: usize = 100;
pub const DEFAULT_BASE_GAS: u64 = 75_000;
pub const DEFAULT_CROSS_INIT_TICK_GAS: u64 = 21_000;

/// Tracker and simulator settings, loaded from `FLUID_DEX_V2_*` variables.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Exchange name stamped on tracked pools.
    #[serde(default = "default_dex_id")]
    pub dex_id: String,
    /// DEX v2 contract exposing `readFromStorage`.
    #[serde(default)]
    pub dex: Address,
    #[serde(default = "default_tick_chunk_size")]
    pub tick_chunk_size: usize,
    #[serde(default = "default_base_gas")]
    pub base_gas: u64,
    #[serde(default = "default_cross_init_tick_gas")]
    pub cross_init_tick_gas: u64,
    /// Quote pools whose tick set is empty instead of rejecting them.
    #[serde(default)]
    pub allow_empty_ticks: bool,
}

fn default_dex_id() -> String {
    crate::DEX_TYPE_FLUID_DEX_V2.to_string()
}

fn default_tick_chunk_size() -> usize {
    DEFAULT_TICK_CHUNK_SIZE
}

fn default_base_gas() -> u64 {
    DEFAULT_BASE_GAS
}

fn default_cross_init_tick_gas() -> u64 {
    DEFAULT_CROSS_INIT_TICK_GAS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dex_id: default_dex_id(),
            dex: Address::ZERO,
            tick_chunk_size: DEFAULT_TICK_CHUNK_SIZE,
            base_gas: DEFAULT_BASE_GAS,
            cross_init_tick_gas: DEFAULT_CROSS_INIT_TICK_GAS,
            allow_empty_ticks: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Config>()?)
    }

    /// Loads from an explicit set of variables, e.g. a parsed `.env` file.
    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, Config>(vars)?)
    }

    /// Gas charged for a quote that crossed `crossed` initialized ticks.
    pub fn gas(&self, crossed: u32) -> u64 {
        self.base_gas
            .saturating_add(self.cross_init_tick_gas.saturating_mul(crossed as u64))
    }
}
