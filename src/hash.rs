//! Hash map alias used for tick bitmaps and tick lookups.
//!
//! The hasher is selected by cargo feature; `std-hash` (or any conflicting
//! combination) falls back to the standard SipHash containers.

#[cfg(all(
    feature = "rustc-hash",
    not(any(feature = "ahash", feature = "std-hash"))
))]
mod imp {
    pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;
}

#[cfg(all(
    feature = "ahash",
    not(any(feature = "rustc-hash", feature = "std-hash"))
))]
mod imp {
    pub type FastMap<K, V> = ahash::AHashMap<K, V>;
}

#[cfg(any(
    all(
        not(feature = "rustc-hash"),
        not(feature = "ahash"),
        not(feature = "std-hash")
    ),
    feature = "std-hash",
    all(feature = "rustc-hash", feature = "ahash"),
))]
mod imp {
    pub type FastMap<K, V> = std::collections::HashMap<K, V>;
}

pub use imp::FastMap;
