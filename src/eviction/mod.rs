//! Pluggable eviction policies.
//!
//! An eviction policy is an ordered key→value container that the bounded
//! cache in [`crate::cache`] delegates all ordering decisions to. The cache
//! itself only ever asks a policy to insert, update, look up, remove, or
//! reclaim bytes on overflow — it makes no assumption about *how* the policy
//! picks victims, which is what makes LRU, FIFO, or any other discipline a
//! drop-in replacement for one another.

mod fifo;
mod lru;

pub use fifo::FifoEviction;
pub use lru::LruEviction;

use crate::entry::CacheEntry;

/// The capability set every eviction policy must provide.
///
/// Byte accounting (`used_bytes`, the `max_bytes` budget) lives one layer up
/// in [`crate::cache::BoundedCache`]; a policy only orders keys and, when
/// asked, evicts from the "worst" end until it has freed at least the
/// requested number of bytes.
pub trait EvictionPolicy: std::fmt::Debug + Send {
    /// Adds a new key. The caller guarantees `key` is not already present.
    fn insert(&mut self, key: String, entry: CacheEntry);

    /// Replaces the entry for an existing key, refreshing its priority.
    /// The caller guarantees `key` is already present.
    fn update(&mut self, key: &str, entry: CacheEntry);

    /// Looks up a key, refreshing its priority on a hit.
    fn get(&mut self, key: &str) -> Option<&CacheEntry>;

    /// Drops a key. Idempotent on absent keys. Returns the removed entry, if any.
    fn remove(&mut self, key: &str) -> Option<CacheEntry>;

    /// Evicts entries from the worst end until cumulative reclaimed bytes
    /// reach `over_bytes` or the policy runs out of entries, returning the
    /// total bytes actually reclaimed.
    fn on_full(&mut self, over_bytes: usize) -> usize;

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    /// Whether the policy currently tracks no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Constructs a named eviction policy, for the builder-style dispatch
/// described by the group configuration (`"lru"`, `"fifo"`).
pub fn by_name(name: &str) -> Option<Box<dyn EvictionPolicy>> {
    match name {
        "lru" => Some(Box::new(LruEviction::new())),
        "fifo" => Some(Box::new(FifoEviction::new())),
        _ => None,
    }
}
