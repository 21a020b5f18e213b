#![allow(dead_code)]

use alloy_primitives::address;
use criterion::{BenchmarkId, Criterion};
use fluid_dex_v2::codec::packed::{DexVariables2, ExchangePricesAndConfig, calculate_vars};
use fluid_dex_v2::codec::storage_slot::tick_data_slot;
use fluid_dex_v2::math::dynamic_fee::DynamicFeeVariables;
use fluid_dex_v2::math::swap_math::{FeeSchedule, compute_swap_step_with_fees};
use fluid_dex_v2::math::tick_bitmap::{TickBitmap, flip_tick, next_initialized_tick_within_one_word};
use fluid_dex_v2::math::{sqrt_price_math, tick_math};
use fluid_dex_v2::pool::engine::{PoolState, SwapParams};
use fluid_dex_v2::pool::types::PoolToken;
use fluid_dex_v2::{
    Address, B256, Extra, I256, PoolIdentity, PoolRecord, PoolSimulator, Q96, StaticExtra, Tick, U256,
};
use std::hint::black_box;

pub const TOKEN0: Address = address!("1111111111111111111111111111111111111111");
pub const TOKEN1: Address = address!("2222222222222222222222222222222222222222");
pub const LIQUIDITY: u128 = 1_000_000_000_000_000;
pub const RANGES: i32 = 50;
pub const NOW: u64 = 1_700_000_000;

fn prices() -> U256 {
    ExchangePricesAndConfig {
        supply_exchange_price: 1_000_000_000_000,
        borrow_exchange_price: 1_000_000_000_000,
        last_timestamp: NOW,
        ..Default::default()
    }
    .encode()
}

pub fn constant_fee_vars() -> DexVariables2 {
    DexVariables2 {
        protocol_fee_0_to_1: 1_000,
        lp_fee: 3_000,
        token0_decimals: 9,
        token1_decimals: 9,
        ..Default::default()
    }
}

pub fn dynamic_fee_vars() -> DexVariables2 {
    DexVariables2 {
        fee_version: 1,
        min_fee: 100,
        max_fee: 10_000,
        price_impact_to_fee_division_factor: 10,
        ..constant_fee_vars()
    }
}

/// Nested ranges `[-60 i, 60 i]`, each with the same liquidity.
pub fn nested_ticks() -> Vec<Tick> {
    let net = I256::try_from(LIQUIDITY).unwrap();
    let mut ticks: Vec<Tick> = (1..=RANGES)
        .flat_map(|i| {
            [
                Tick::new(-60 * i, U256::from(LIQUIDITY), net),
                Tick::new(60 * i, U256::from(LIQUIDITY), -net),
            ]
        })
        .collect();
    ticks.sort_by_key(|t| t.index);
    ticks
}

pub fn pool_state() -> PoolState {
    PoolState::new(Q96, 0, LIQUIDITY * RANGES as u128, 60, &nested_ticks()).unwrap()
}

pub fn pool_record(vars: &DexVariables2) -> PoolRecord {
    let identity = PoolIdentity::new(B256::repeat_byte(0x01), 3);
    let extra = Extra {
        liquidity: LIQUIDITY * RANGES as u128,
        sqrt_price_x96: Q96,
        tick: 0,
        dex_variables2: vars.encode(),
        token0_exchange_prices_and_config: prices(),
        token1_exchange_prices_and_config: prices(),
        ticks: nested_ticks(),
        reserves: None,
        block_timestamp: NOW,
    };
    let static_extra = StaticExtra {
        dex_id: identity.dex_id,
        dex_type: identity.dex_type,
        fee: 3_000,
        tick_spacing: 60,
        ..Default::default()
    };

    let mut record = PoolRecord {
        address: identity.address(),
        exchange: fluid_dex_v2::DEX_TYPE_FLUID_DEX_V2.to_string(),
        tokens: [
            PoolToken {
                address: TOKEN0,
                decimals: 9,
            },
            PoolToken {
                address: TOKEN1,
                decimals: 9,
            },
        ],
        ..Default::default()
    };
    record.set_extra(&extra).unwrap();
    record.set_static_extra(&static_extra).unwrap();
    record
}

// ---------------- math ----------------

pub fn bench_tick_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_math");
    for tick in [-887_272, -60_000, 0, 60_000, 887_272] {
        group.bench_with_input(BenchmarkId::new("get_sqrt_ratio_at_tick", tick), &tick, |b, &tick| {
            b.iter(|| tick_math::get_sqrt_ratio_at_tick(black_box(tick)).unwrap())
        });
    }

    let sqrt_price = tick_math::get_sqrt_ratio_at_tick(12_345).unwrap();
    group.bench_function("get_tick_at_sqrt_ratio", |b| {
        b.iter(|| tick_math::get_tick_at_sqrt_ratio(black_box(sqrt_price)).unwrap())
    });
    group.finish();
}

pub fn bench_sqrt_price_math(c: &mut Criterion) {
    let upper = tick_math::get_sqrt_ratio_at_tick(600).unwrap();
    let amount = U256::from(1_000_000_000u64);

    let mut group = c.benchmark_group("sqrt_price_math");
    group.bench_function("get_amount_0_delta", |b| {
        b.iter(|| sqrt_price_math::get_amount_0_delta(black_box(Q96), black_box(upper), LIQUIDITY, true).unwrap())
    });
    group.bench_function("get_amount_1_delta", |b| {
        b.iter(|| sqrt_price_math::get_amount_1_delta(black_box(Q96), black_box(upper), LIQUIDITY, true).unwrap())
    });
    group.bench_function("get_next_sqrt_price_from_input", |b| {
        b.iter(|| {
            sqrt_price_math::get_next_sqrt_price_from_input(black_box(Q96), LIQUIDITY, black_box(amount), true)
                .unwrap()
        })
    });
    group.finish();
}

pub fn bench_swap_math(c: &mut Criterion) {
    let target = tick_math::get_sqrt_ratio_at_tick(-600).unwrap();
    let amount = I256::try_from(1_000_000_000i64).unwrap();
    let constant = FeeSchedule::for_swap(&constant_fee_vars(), Q96, true, NOW).unwrap();
    let dynamic = FeeSchedule::for_swap(&dynamic_fee_vars(), Q96, true, NOW).unwrap();

    let mut group = c.benchmark_group("swap_math");
    for (name, schedule) in [("constant_fee", constant), ("dynamic_fee", dynamic)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                compute_swap_step_with_fees(black_box(Q96), black_box(target), LIQUIDITY, black_box(amount), &schedule)
                    .unwrap()
            })
        });
    }
    group.finish();
}

pub fn bench_dynamic_fee(c: &mut Criterion) {
    let vars = dynamic_fee_vars();
    let lower = tick_math::get_sqrt_ratio_at_tick(-600).unwrap();

    let mut group = c.benchmark_group("dynamic_fee");
    group.bench_function("derive", |b| {
        b.iter(|| DynamicFeeVariables::derive(black_box(Q96), true, &vars, NOW).unwrap())
    });
    let derived = DynamicFeeVariables::derive(Q96, true, &vars, NOW).unwrap();
    group.bench_function("fee_between", |b| {
        b.iter(|| derived.fee_between(black_box(Q96), black_box(lower)).unwrap())
    });
    group.finish();
}

pub fn bench_tick_bitmap(c: &mut Criterion) {
    let mut bitmap = TickBitmap::default();
    for tick in nested_ticks() {
        flip_tick(&mut bitmap, tick.index, 60).unwrap();
    }

    let mut group = c.benchmark_group("tick_bitmap");
    for lte in [true, false] {
        group.bench_with_input(BenchmarkId::new("next_initialized_tick", lte), &lte, |b, &lte| {
            b.iter(|| next_initialized_tick_within_one_word(&bitmap, black_box(-30), 60, lte).unwrap())
        });
    }
    group.finish();
}

pub fn bench_codecs(c: &mut Criterion) {
    let dex_id = B256::repeat_byte(0x01);
    let vars = constant_fee_vars().encode();
    let prices = prices();

    let mut group = c.benchmark_group("codec");
    group.bench_function("tick_data_slot", |b| {
        b.iter(|| tick_data_slot(3, black_box(dex_id), black_box(-887_220)))
    });
    group.bench_function("dex_variables2_decode", |b| {
        b.iter(|| DexVariables2::decode(black_box(vars)))
    });
    group.bench_function("calculate_vars", |b| {
        b.iter(|| calculate_vars(black_box(vars), black_box(prices), black_box(prices), NOW).unwrap())
    });
    group.finish();
}

// ---------------- swap ----------------

pub fn bench_engine_swap(c: &mut Criterion) {
    let state = pool_state();
    let schedule = FeeSchedule::for_swap(&constant_fee_vars(), Q96, true, NOW).unwrap();

    let mut group = c.benchmark_group("engine_swap");
    for amount in [1_000_000u64, 1_000_000_000_000, 1_000_000_000_000_000] {
        let params = SwapParams::new(
            true,
            I256::try_from(amount).unwrap(),
            tick_math::MIN_SQRT_RATIO + U256::from(1u64),
        );
        group.bench_with_input(BenchmarkId::new("exact_in_zero_for_one", amount), &params, |b, params| {
            b.iter(|| state.swap(black_box(*params), &schedule).unwrap())
        });
    }
    group.finish();
}

pub fn bench_calc_amount_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("calc_amount_out");
    for (name, vars) in [("constant_fee", constant_fee_vars()), ("dynamic_fee", dynamic_fee_vars())] {
        let pool = PoolSimulator::new(&pool_record(&vars)).unwrap();
        let amount = U256::from(1_000_000_000_000u64);
        group.bench_function(name, |b| {
            b.iter(|| pool.calc_amount_out(TOKEN0, black_box(amount), TOKEN1).unwrap())
        });
    }
    group.finish();
}
