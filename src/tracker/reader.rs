use crate::error::ReadError;
use alloy_primitives::{B256, U256};
use std::future::Future;

/// Scalar pool state as returned by the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DexPoolState {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
    pub dex_variables2: U256,
    pub token0_exchange_prices_and_config: U256,
    pub token1_exchange_prices_and_config: U256,
    /// Packed raw reserves of both tokens.
    pub token_reserves: U256,
}

/// Remote access to DEX v2 storage. `block == None` reads at latest.
pub trait StateReader: Send + Sync {
    /// Reads one word per slot, in order.
    fn read_storage(
        &self,
        slots: &[B256],
        block: Option<u64>,
    ) -> impl Future<Output = Result<Vec<U256>, ReadError>> + Send;

    fn get_dex_pool_state(
        &self,
        dex_type: u32,
        dex_id: B256,
        block: Option<u64>,
    ) -> impl Future<Output = Result<DexPoolState, ReadError>> + Send;
}
