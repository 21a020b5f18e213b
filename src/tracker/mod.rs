//! Keeps a pool's tick liquidity consistent with the chain.
//!
//! Logs are replayed locally when possible. Reorgs, or any replay that
//! leaves the tick set inconsistent, fall back to reading the affected ticks
//! from storage, and then to re-reading every known tick.

pub mod events;
#[cfg(feature = "onchain")]
pub mod onchain;
pub mod reader;
pub mod reconcile;
pub mod subgraph;

use crate::FastMap;
use crate::codec::packed::extract_token_reserves;
use crate::codec::storage_slot::{tick_data_slot, tick_liquidity_gross_slot};
use crate::config::Config;
use crate::error::{Error, ReadError, TrackerError};
use crate::pool::types::{Extra, PoolIdentity, PoolRecord, Tick};
use alloy_primitives::{B256, I256};
use futures::future::try_join_all;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

pub use events::{EventLog, LiquidityChange, PoolEvent, decode_event};
pub use reader::{DexPoolState, StateReader};
pub use reconcile::TickMap;
pub use subgraph::{SUBGRAPH_PAGE_SIZE, SubgraphTick, SubgraphTicks};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub timestamp: u64,
}

pub struct PoolTracker<R> {
    config: Config,
    reader: R,
}

impl<R: StateReader> PoolTracker<R> {
    pub fn new(config: Config, reader: R) -> Self {
        Self { config, reader }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Applies `logs` to `record` and re-reads the scalar pool state at the
    /// newest log block. Returns the record unchanged when there are no logs.
    pub async fn get_new_state(
        &self,
        record: &PoolRecord,
        logs: &[EventLog],
        block_headers: &FastMap<u64, BlockHeader>,
    ) -> Result<PoolRecord, Error> {
        let Some(block_number) = logs.iter().map(|l| l.block_number).max() else {
            return Ok(record.clone());
        };

        let identity = record.identity()?;
        let mut extra = record.extra()?;

        let ticks = if logs.iter().any(|l| l.removed) {
            info!(pool = %record.address, block_number, "reorg detected, refetching ticks");
            self.fetch_ticks_from_logs(&identity, &extra, logs, block_number)
                .await?
        } else {
            self.compute_ticks_from_logs(&identity, &extra, logs, block_number)
                .await?
        };
        extra.ticks = reconcile::live_ticks(&ticks);

        let mut next = record.clone();
        let state = self.fetch_rpc_data(&identity, Some(block_number)).await?;
        apply_pool_state(&mut next, &mut extra, &state);

        if let Some(timestamp) = estimate_last_activity_time(logs, block_headers) {
            next.timestamp = next.timestamp.max(timestamp);
            extra.block_timestamp = extra.block_timestamp.max(timestamp);
        }
        next.block_number = block_number;
        next.set_extra(&extra)?;

        debug!(
            pool = %next.address,
            block_number,
            ticks = extra.ticks.len(),
            "pool state updated"
        );
        Ok(next)
    }

    /// Reads the scalar pool state, falling back to latest when the node no
    /// longer holds state at `block`.
    pub async fn fetch_rpc_data(
        &self,
        identity: &PoolIdentity,
        block: Option<u64>,
    ) -> Result<DexPoolState, Error> {
        let result = self
            .reader
            .get_dex_pool_state(identity.dex_type, identity.dex_id, block)
            .await;

        match result {
            Err(err) if block.is_some() && err.is_missing_state() => {
                warn!(pool = %identity.address(), block_number = ?block, error = %err, "state pruned, reading at latest");
                Ok(self
                    .reader
                    .get_dex_pool_state(identity.dex_type, identity.dex_id, None)
                    .await?)
            }
            other => Ok(other?),
        }
    }

    /// Re-reads every tick of `record` at latest. Returns the live ticks.
    pub async fn fetch_pool_ticks(&self, record: &PoolRecord) -> Result<Vec<Tick>, Error> {
        let identity = record.identity()?;
        let extra = record.extra()?;
        let indices: Vec<i32> = extra.ticks.iter().map(|t| t.index).collect();

        let mut ticks = reconcile::tick_map(&extra.ticks);
        reconcile::update_ticks(&mut ticks, self.query_ticks(&identity, &indices, None).await?);
        Ok(reconcile::live_ticks(&ticks))
    }

    /// Seeds `record` with the subgraph tick set and the latest scalar state.
    pub async fn bootstrap_ticks<S: SubgraphTicks>(
        &self,
        subgraph: &S,
        record: &PoolRecord,
    ) -> Result<PoolRecord, Error> {
        let identity = record.identity()?;
        let mut extra = record.extra()?;

        let (state, mut ticks) = futures::try_join!(self.fetch_rpc_data(&identity, None), async {
            subgraph::fetch_all_ticks(subgraph, &record.address)
                .await
                .map_err(Error::from)
        })?;
        ticks.sort_by_key(|t| t.index);
        info!(pool = %record.address, ticks = ticks.len(), "bootstrapped ticks");

        let mut next = record.clone();
        extra.ticks = ticks;
        apply_pool_state(&mut next, &mut extra, &state);
        next.set_extra(&extra)?;
        Ok(next)
    }

    async fn fetch_ticks_from_logs(
        &self,
        identity: &PoolIdentity,
        extra: &Extra,
        logs: &[EventLog],
        block_number: u64,
    ) -> Result<TickMap, Error> {
        let mut affected = BTreeSet::new();
        for log in logs {
            match events::liquidity_change(log, identity) {
                Ok(Some(change)) if !change.liquidity_delta.is_zero() => {
                    affected.insert(change.tick_lower);
                    affected.insert(change.tick_upper);
                }
                Ok(_) => {}
                Err(err) => warn!(pool = %identity.address(), error = %err, "skipping undecodable log"),
            }
        }

        let mut ticks = reconcile::tick_map(&extra.ticks);
        if affected.is_empty() {
            return Ok(ticks);
        }
        self.refetch(identity, &mut ticks, &affected, block_number)
            .await?;
        Ok(ticks)
    }

    async fn compute_ticks_from_logs(
        &self,
        identity: &PoolIdentity,
        extra: &Extra,
        logs: &[EventLog],
        block_number: u64,
    ) -> Result<TickMap, Error> {
        let mut ordered: Vec<&EventLog> = logs.iter().collect();
        ordered.sort_by_key(|l| (l.block_number, l.log_index));

        let mut ticks = reconcile::tick_map(&extra.ticks);
        let mut affected = BTreeSet::new();
        let mut invalid = BTreeSet::new();

        for log in ordered {
            let change = match events::liquidity_change(log, identity) {
                Ok(Some(change)) => change,
                Ok(None) => continue,
                Err(err) => {
                    warn!(pool = %identity.address(), block_number = log.block_number, error = %err, "skipping undecodable log");
                    continue;
                }
            };
            if change.liquidity_delta.is_zero() {
                continue;
            }

            for (index, is_lower) in [(change.tick_lower, true), (change.tick_upper, false)] {
                affected.insert(index);
                if !reconcile::apply_liquidity_change(&mut ticks, index, change.liquidity_delta, is_lower) {
                    invalid.insert(index);
                }
            }
        }

        // An untouched tick set is kept as stored.
        if affected.is_empty() || (invalid.is_empty() && reconcile::has_valid_ticks(&ticks)) {
            return Ok(ticks);
        }

        warn!(
            pool = %identity.address(),
            block_number,
            invalid_ticks = ?invalid,
            "replayed ticks are inconsistent"
        );
        self.refetch(identity, &mut ticks, &affected, block_number)
            .await?;
        Ok(ticks)
    }

    /// Reads `affected` at `block_number`; if the set is still inconsistent,
    /// reads every known tick.
    async fn refetch(
        &self,
        identity: &PoolIdentity,
        ticks: &mut TickMap,
        affected: &BTreeSet<i32>,
        block_number: u64,
    ) -> Result<(), Error> {
        let indices: Vec<i32> = affected.iter().copied().collect();
        let fresh = self
            .query_ticks(identity, &indices, Some(block_number))
            .await?;
        reconcile::update_ticks(ticks, fresh);
        if reconcile::has_valid_ticks(ticks) {
            return Ok(());
        }

        warn!(
            pool = %identity.address(),
            block_number,
            affected_ticks = ?indices,
            "affected ticks still inconsistent, refetching all ticks"
        );
        let all: Vec<i32> = ticks.keys().copied().collect();
        let fresh = self.query_ticks(identity, &all, Some(block_number)).await?;
        reconcile::update_ticks(ticks, fresh);
        if reconcile::has_all_valid_ticks(ticks) {
            return Ok(());
        }

        error!(pool = %identity.address(), block_number, "tick set invalid after full refetch");
        Err(TrackerError::InvalidTicks(block_number).into())
    }

    /// Reads liquidity of `indices` in chunks of `tick_chunk_size`.
    async fn query_ticks(
        &self,
        identity: &PoolIdentity,
        indices: &[i32],
        block: Option<u64>,
    ) -> Result<Vec<Tick>, Error> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.config.tick_chunk_size.max(1);
        let chunks = indices
            .chunks(chunk_size)
            .map(|chunk| self.query_tick_chunk(identity, chunk, block));
        let ticks = try_join_all(chunks).await?;

        Ok(ticks.into_iter().flatten().collect())
    }

    async fn query_tick_chunk(
        &self,
        identity: &PoolIdentity,
        indices: &[i32],
        block: Option<u64>,
    ) -> Result<Vec<Tick>, ReadError> {
        let slots: Vec<B256> = indices
            .iter()
            .flat_map(|&tick| {
                [
                    tick_data_slot(identity.dex_type, identity.dex_id, tick),
                    tick_liquidity_gross_slot(identity.dex_type, identity.dex_id, tick),
                ]
            })
            .collect();

        debug!(pool = %identity.address(), block_number = ?block, ticks = indices.len(), "reading tick chunk");
        let words = match self.reader.read_storage(&slots, block).await {
            Err(err) if block.is_some() && err.is_missing_state() => {
                warn!(pool = %identity.address(), block_number = ?block, error = %err, "state pruned, reading ticks at latest");
                self.reader.read_storage(&slots, None).await?
            }
            other => other?,
        };

        if words.len() != slots.len() {
            return Err(ReadError::LengthMismatch {
                expected: slots.len(),
                actual: words.len(),
            });
        }

        Ok(indices
            .iter()
            .zip(words.chunks_exact(2))
            .map(|(&index, pair)| Tick::new(index, pair[1], I256::from_raw(pair[0])))
            .collect())
    }
}

/// Writes the freshly read scalar state into `extra` and the reserves into
/// the record.
fn apply_pool_state(record: &mut PoolRecord, extra: &mut Extra, state: &DexPoolState) {
    extra.sqrt_price_x96 = state.sqrt_price_x96;
    extra.tick = state.tick;
    extra.liquidity = state.liquidity;
    extra.dex_variables2 = state.dex_variables2;
    extra.token0_exchange_prices_and_config = state.token0_exchange_prices_and_config;
    extra.token1_exchange_prices_and_config = state.token1_exchange_prices_and_config;
    extra.reserves = None;

    let (reserve0, reserve1) = extract_token_reserves(state.token_reserves);
    record.reserves = [reserve0, reserve1];
}

/// Timestamp of the newest log block with a known header.
fn estimate_last_activity_time(
    logs: &[EventLog],
    block_headers: &FastMap<u64, BlockHeader>,
) -> Option<u64> {
    logs.iter()
        .filter_map(|l| block_headers.get(&l.block_number).map(|h| (l.block_number, h.timestamp)))
        .max_by_key(|&(block_number, _)| block_number)
        .map(|(_, timestamp)| timestamp)
}
