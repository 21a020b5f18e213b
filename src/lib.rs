//! Off-chain quoting and state tracking for Fluid DEX v2 concentrated-liquidity pools.
//!
//! This crate exposes:
//! - Low-level math primitives (`math::*`) for ticks, prices, bitmaps, the
//!   fee-on-output swap step and the three-segment dynamic fee curve.
//! - Codecs (`codec::*`) for packed storage words and storage-slot derivation.
//! - An in-memory pool simulator (`pool::*`) that quotes `calc_amount_out`
//!   in natural token units.
//! - A pool tracker (`tracker::*`) that keeps tick liquidity consistent with
//!   the chain through log replay and selective re-fetch.
//! - Optional `onchain` helpers that read pool state through an alloy provider.
//!
//! # Examples
//!
//! ## Pure math
//! ```no_run
//! use fluid_dex_v2::{math::tick_math, RESOLUTION, U256};
//!
//! let sqrt_price = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
//! assert!(sqrt_price > U256::ZERO);
//! assert_eq!(RESOLUTION, 96);
//! ```
//!
//! ## Quoting a swap
//! ```no_run
//! use fluid_dex_v2::{PoolRecord, PoolSimulator, U256};
//!
//! # fn load() -> PoolRecord { unimplemented!() }
//! let record: PoolRecord = load();
//! let simulator = PoolSimulator::new(&record).unwrap();
//! let token_in = simulator.tokens()[0];
//! let token_out = simulator.tokens()[1];
//! let quote = simulator
//!     .calc_amount_out(token_in, U256::from(1_000_000_000u64), token_out)
//!     .unwrap();
//! println!("amount out: {} (gas {})", quote.amount_out, quote.gas);
//! ```

pub use alloy_primitives::{Address, B256, I256, U256};

pub mod codec;
pub mod config;
pub mod error;
mod hash;
pub mod math;
pub mod pool;
pub mod tracker;

pub use config::Config;
pub use error::Error;
pub use hash::FastMap;
pub use pool::registry::{AnyPoolSimulator, PoolSimulatorCapability, SimulatorRegistry};
pub use pool::simulator::{CalcAmountOutResult, PoolSimulator};
pub use pool::types::{DexKey, Extra, PoolIdentity, PoolRecord, StaticExtra, Tick};
pub use tracker::{BlockHeader, EventLog, PoolTracker, StateReader};

/// Exchange name reported by pools of this family.
pub const DEX_TYPE_FLUID_DEX_V2: &str = "fluid-dex-v2";

pub(crate) const U256_1: U256 = U256::from_limbs([1, 0, 0, 0]);

pub(crate) const U160_MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, u32::MAX as u64, 0]);
pub(crate) const U256_E4: U256 = U256::from_limbs([10_000, 0, 0, 0]);
pub(crate) const U256_E6: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
