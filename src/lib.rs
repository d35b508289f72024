//! chained-map: a single-threaded hash map that resolves collisions by
//! separate chaining over an explicit, growable bucket table.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every structural decision (which bucket, which chain slot,
//!   when to grow) visible and testable instead of hidden behind an opaque
//!   probing table.
//! - Layers:
//!   - `ChainedMap<K, V, S>`: owns the bucket array and the entry count;
//!     all keyed operations go through one bucket-index function and then
//!     scan a single chain.
//!   - Views: `Iter`/`IterMut`/`Keys` walk the table in bucket order, then
//!     chain order; `EntrySet` borrows the map; `KeySet` is an owned
//!     snapshot of the keys.
//!   - `MapConfig`: initial bucket count and load threshold, validated at
//!     construction.
//!
//! Constraints
//! - Single-threaded: no interior locking. Share across threads only behind
//!   an external lock.
//! - A bucket is `None` until a key lands there and returns to `None` when
//!   its chain empties.
//! - New keys are prepended to their chain; re-inserting an existing key
//!   replaces the value in place.
//! - `len()` always equals the total chain length, and after any insertion
//!   `len() / bucket_count()` is at most the load threshold.
//!
//! Indexing and growth
//! - Index = signed hash modulo table length, shifted up by one length when
//!   negative.
//! - Crossing the threshold rebuilds the table at `2n + 1` buckets by
//!   reinserting every entry, bucket by bucket, through the normal insertion
//!   path. Reinsertion never re-checks the threshold, so a rebuild cannot
//!   cascade.
//!
//! Notes and non-goals
//! - Equality and `Hash` are defined over the key set only; values are
//!   ignored.
//! - `put_all` and `values` are deliberately unsupported and return
//!   `MapError::Unsupported`.
//! - `clear()` resets to a fresh table of the configured initial length; the
//!   map remains usable.
//! - Keys cannot be null: every keyed operation takes a reference, so the
//!   invalid-key case is ruled out by the type system.

mod chained_map;
mod chained_map_proptest;
pub mod config;
mod error;
pub mod views;

// Public surface
pub use chained_map::ChainedMap;
pub use config::{
    MapConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_THRESHOLD, MIN_LOAD_THRESHOLD,
};
pub use error::MapError;
pub use views::{EntrySet, Iter, IterMut, KeySet, Keys};
