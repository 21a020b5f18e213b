//! Shared pool fixtures for unit tests.

use crate::codec::packed::{DexVariables2, ExchangePricesAndConfig};
use crate::pool::types::{Extra, PoolIdentity, PoolRecord, PoolToken, StaticExtra, Tick};
use crate::{DEX_TYPE_FLUID_DEX_V2, Q96};
use alloy_primitives::{Address, B256, I256, U256, address, b256};

pub(crate) const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub(crate) const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

pub(crate) const DEX_ID: B256 =
    b256!("0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20");
pub(crate) const DEX_TYPE: u32 = 3;

pub(crate) const L: u128 = 1_000_000_000_000_000;

pub(crate) fn prices(supply: u64) -> U256 {
    ExchangePricesAndConfig {
        supply_exchange_price: supply,
        borrow_exchange_price: supply,
        last_timestamp: 1_700_000_000,
        ..Default::default()
    }
    .encode()
}

pub(crate) fn fixture_dex_variables2() -> U256 {
    DexVariables2 {
        fee_version: 0,
        protocol_fee_0_to_1: 1_000,
        protocol_fee_1_to_0: 0,
        lp_fee: 3_000,
        token0_decimals: 6,
        token1_decimals: 15,
        ..Default::default()
    }
    .encode()
}

/// USDC (6 decimals) / WETH (18 decimals) at adjusted price 1, constant
/// 0.3% LP fee and 0.1% protocol fee on 0 -> 1, one range [-600, 600].
pub(crate) fn fixture_record() -> PoolRecord {
    let extra = Extra {
        liquidity: L,
        sqrt_price_x96: Q96,
        tick: 0,
        dex_variables2: fixture_dex_variables2(),
        token0_exchange_prices_and_config: prices(1_000_000_000_000),
        token1_exchange_prices_and_config: prices(1_050_000_000_000),
        ticks: vec![
            Tick::new(-600, U256::from(L), I256::try_from(L).unwrap()),
            Tick::new(600, U256::from(L), -I256::try_from(L).unwrap()),
        ],
        reserves: None,
        block_timestamp: 1_700_000_000,
    };
    let identity = PoolIdentity::new(DEX_ID, DEX_TYPE);
    let static_extra = StaticExtra {
        dex_id: identity.dex_id,
        dex_type: identity.dex_type,
        fee: 3_000,
        tick_spacing: 60,
        ..Default::default()
    };

    let mut record = PoolRecord {
        address: identity.address(),
        exchange: DEX_TYPE_FLUID_DEX_V2.to_string(),
        tokens: [
            PoolToken {
                address: USDC,
                decimals: 6,
            },
            PoolToken {
                address: WETH,
                decimals: 18,
            },
        ],
        block_number: 100,
        timestamp: 1_700_000_000,
        ..Default::default()
    };
    record.set_extra(&extra).unwrap();
    record.set_static_extra(&static_extra).unwrap();
    record
}

/// Dynamic fee from 0.01% to 0.15%, one fee unit per 10 units of price
/// impact, so the kinks sit at 0.1% and 1.5% away from the start price.
pub(crate) fn fixture_dynamic_dex_variables2() -> U256 {
    DexVariables2 {
        fee_version: 1,
        protocol_fee_0_to_1: 1_000,
        protocol_fee_1_to_0: 0,
        lp_fee: 3_000,
        min_fee: 100,
        max_fee: 1_500,
        price_impact_to_fee_division_factor: 10,
        token0_decimals: 6,
        token1_decimals: 15,
        ..Default::default()
    }
    .encode()
}

/// [`fixture_record`] with [`fixture_dynamic_dex_variables2`].
pub(crate) fn fixture_dynamic_record() -> PoolRecord {
    let mut record = fixture_record();
    let mut extra = record.extra().unwrap();
    extra.dex_variables2 = fixture_dynamic_dex_variables2();
    record.set_extra(&extra).unwrap();
    record
}
