//! In-memory tick set edited by log replay and remote re-fetch.

use crate::pool::types::Tick;
use alloy_primitives::{I256, U256};
use std::collections::BTreeMap;

/// Known ticks keyed by index. Entries with zero gross liquidity are kept
/// until the set is written back so a later delta can revive them.
pub type TickMap = BTreeMap<i32, Tick>;

pub fn tick_map(ticks: &[Tick]) -> TickMap {
    ticks.iter().map(|t| (t.index, *t)).collect()
}

/// Applies `delta` at one bound of a position.
///
/// Returns `false` and leaves the tick untouched when the result would drive
/// gross liquidity negative or overflow either field.
pub fn apply_liquidity_change(ticks: &mut TickMap, index: i32, delta: I256, is_lower: bool) -> bool {
    let current = ticks
        .get(&index)
        .copied()
        .unwrap_or_else(|| Tick::new(index, U256::ZERO, I256::ZERO));

    let liquidity_gross = if delta.is_negative() {
        match current.liquidity_gross.checked_sub(delta.unsigned_abs()) {
            Some(gross) => gross,
            None => return false,
        }
    } else {
        match current.liquidity_gross.checked_add(delta.into_raw()) {
            Some(gross) => gross,
            None => return false,
        }
    };

    let liquidity_net = if is_lower {
        current.liquidity_net.checked_add(delta)
    } else {
        current.liquidity_net.checked_sub(delta)
    };
    let Some(liquidity_net) = liquidity_net else {
        return false;
    };

    ticks.insert(index, Tick::new(index, liquidity_gross, liquidity_net));
    true
}

/// Overwrites entries with freshly read values.
pub fn update_ticks(ticks: &mut TickMap, fresh: impl IntoIterator<Item = Tick>) {
    for tick in fresh {
        ticks.insert(tick.index, tick);
    }
}

/// Initialized ticks, ascending.
pub fn live_ticks(ticks: &TickMap) -> Vec<Tick> {
    ticks.values().filter(|t| t.is_initialized()).copied().collect()
}

/// Net liquidity over the live ticks sums to zero.
pub fn has_valid_ticks(ticks: &TickMap) -> bool {
    ticks
        .values()
        .filter(|t| t.is_initialized())
        .try_fold(I256::ZERO, |acc, t| acc.checked_add(t.liquidity_net))
        .is_some_and(|sum| sum.is_zero())
}

/// [`has_valid_ticks`], and no tick carries more net than gross liquidity.
pub fn has_all_valid_ticks(ticks: &TickMap) -> bool {
    has_valid_ticks(ticks)
        && ticks
            .values()
            .all(|t| t.liquidity_gross >= t.liquidity_net.unsigned_abs())
}
