//! [`StateReader`] over an alloy provider: tick slots through a Multicall3
//! `aggregate` of `readFromStorage`, scalar state through a resolver.

use crate::error::ReadError;
use crate::tracker::reader::{DexPoolState, StateReader};
use alloy_primitives::{Address, B256, U256, address};
use alloy_provider::Provider;
use alloy_sol_macro::sol;
use std::sync::Arc;
use tracing::debug;

sol! {
    #[sol(rpc)]
    interface IFluidDexV2 {
        function readFromStorage(bytes32 slot) external view returns (uint256 result);
    }
}

sol! {
    struct Call {
        address target;
        bytes callData;
    }

    #[sol(rpc)]
    interface IMulticall {
        function aggregate(Call[] calls)
            external
            view
            returns (uint256 blockNumber, bytes[] returnData);
    }
}

sol! {
    struct DexPoolStateRaw {
        uint160 sqrtPriceX96;
        int24 tick;
        uint128 liquidity;
        uint256 dexVariables2;
        uint256 token0ExchangePricesAndConfig;
        uint256 token1ExchangePricesAndConfig;
        uint256 tokenReserves;
    }

    #[sol(rpc)]
    interface IFluidDexV2Resolver {
        function getDexPoolState(uint256 dexType, bytes32 dexId)
            external
            view
            returns (DexPoolStateRaw memory state);
    }
}

/// Multicall3, deployed at the same address on every supported chain.
pub const MULTICALL3: Address = address!("ca11bde05977b3631167028862be2a173976ca11");

pub type OnchainProvider<P> = Arc<P>;

pub struct AlloyStateReader<P> {
    dex: IFluidDexV2::IFluidDexV2Instance<OnchainProvider<P>>,
    resolver: IFluidDexV2Resolver::IFluidDexV2ResolverInstance<OnchainProvider<P>>,
    multicall: IMulticall::IMulticallInstance<OnchainProvider<P>>,
}

impl<P> AlloyStateReader<P>
where
    P: Provider + Send + Sync + 'static,
{
    pub fn new(provider: OnchainProvider<P>, dex: Address, resolver: Address) -> Self {
        Self::with_multicall(provider, dex, resolver, MULTICALL3)
    }

    pub fn with_multicall(
        provider: OnchainProvider<P>,
        dex: Address,
        resolver: Address,
        multicall: Address,
    ) -> Self {
        Self {
            dex: IFluidDexV2::IFluidDexV2Instance::new(dex, provider.clone()),
            resolver: IFluidDexV2Resolver::IFluidDexV2ResolverInstance::new(resolver, provider.clone()),
            multicall: IMulticall::IMulticallInstance::new(multicall, provider),
        }
    }
}

/// Nodes report pruned historical state as a missing trie node.
fn classify(err: impl ToString, block: Option<u64>) -> ReadError {
    let message = err.to_string();
    match block {
        Some(block_number) if message.contains("missing trie node") => ReadError::MissingState {
            block_number,
            message,
        },
        _ => ReadError::Transport(message),
    }
}

impl<P> StateReader for AlloyStateReader<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn read_storage(&self, slots: &[B256], block: Option<u64>) -> Result<Vec<U256>, ReadError> {
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let calls: Vec<Call> = slots
            .iter()
            .map(|slot| Call {
                target: *self.dex.address(),
                callData: self.dex.readFromStorage(*slot).calldata().to_owned(),
            })
            .collect();

        let mut agg = self.multicall.aggregate(calls);
        if let Some(bn) = block {
            agg = agg.block(bn.into());
        }
        let result = agg.call().await.map_err(|e| classify(e, block))?;
        debug!(block_number = ?block, slots = slots.len(), "read storage slots");

        if result.returnData.len() != slots.len() {
            return Err(ReadError::LengthMismatch {
                expected: slots.len(),
                actual: result.returnData.len(),
            });
        }

        slots
            .iter()
            .zip(result.returnData)
            .map(|(slot, raw)| {
                self.dex
                    .readFromStorage(*slot)
                    .decode_output(raw)
                    .map_err(|e| ReadError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn get_dex_pool_state(
        &self,
        dex_type: u32,
        dex_id: B256,
        block: Option<u64>,
    ) -> Result<DexPoolState, ReadError> {
        let mut call = self.resolver.getDexPoolState(U256::from(dex_type), dex_id);
        if let Some(bn) = block {
            call = call.block(bn.into());
        }
        let raw = call.call().await.map_err(|e| classify(e, block))?;

        Ok(DexPoolState {
            sqrt_price_x96: U256::from(raw.sqrtPriceX96),
            tick: raw.tick.as_i32(),
            liquidity: raw.liquidity,
            dex_variables2: raw.dexVariables2,
            token0_exchange_prices_and_config: raw.token0ExchangePricesAndConfig,
            token1_exchange_prices_and_config: raw.token1ExchangePricesAndConfig,
            token_reserves: raw.tokenReserves,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pruned_state_is_only_reported_for_historical_reads() {
        let err = "server returned an error response: error code -32000: missing trie node abc";
        assert!(matches!(
            classify(err, Some(7)),
            ReadError::MissingState { block_number: 7, .. }
        ));
        assert!(matches!(classify(err, None), ReadError::Transport(_)));
        assert!(matches!(
            classify("connection reset", Some(7)),
            ReadError::Transport(_)
        ));
    }
}
