//! Codecs for raw on-chain words: bit-packed fields and storage slots.

pub mod packed;
pub mod storage_slot;
