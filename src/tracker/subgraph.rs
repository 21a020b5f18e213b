//! Paginated tick download used to seed a pool's tick set.

use crate::error::TrackerError;
use crate::pool::types::Tick;
use alloy_primitives::{I256, U256};
use std::future::Future;
use tracing::debug;

pub const SUBGRAPH_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubgraphTick {
    pub tick: i32,
    pub liquidity_net: I256,
    pub liquidity_gross: U256,
}

impl From<SubgraphTick> for Tick {
    fn from(t: SubgraphTick) -> Self {
        Tick::new(t.tick, t.liquidity_gross, t.liquidity_net)
    }
}

pub trait SubgraphTicks: Send + Sync {
    /// Up to `first` ticks of `pool_id` with positive gross liquidity,
    /// ascending, strictly above `after_tick`.
    fn ticks_page(
        &self,
        pool_id: &str,
        after_tick: Option<i32>,
        first: usize,
    ) -> impl Future<Output = Result<Vec<SubgraphTick>, TrackerError>> + Send;
}

/// Walks every page of `pool_id`.
pub async fn fetch_all_ticks<S: SubgraphTicks>(
    subgraph: &S,
    pool_id: &str,
) -> Result<Vec<Tick>, TrackerError> {
    let mut ticks = Vec::new();
    let mut after_tick = None;

    loop {
        let page = subgraph
            .ticks_page(pool_id, after_tick, SUBGRAPH_PAGE_SIZE)
            .await?;
        debug!(pool = %pool_id, after_tick = ?after_tick, count = page.len(), "subgraph tick page");

        let Some(last) = page.last() else {
            break;
        };
        if after_tick.is_some_and(|after| last.tick <= after) {
            return Err(TrackerError::Subgraph(format!(
                "tick cursor did not advance past {}",
                last.tick
            )));
        }
        after_tick = Some(last.tick);
        let full = page.len() >= SUBGRAPH_PAGE_SIZE;

        ticks.extend(
            page.into_iter()
                .filter(|t| !t.liquidity_gross.is_zero())
                .map(Tick::from),
        );

        if !full {
            break;
        }
    }

    Ok(ticks)
}
