//! Least-recently-used eviction: the reference policy.
//!
//! Ordering is delegated to the `lru` crate's intrusive list (the same crate
//! the rest of this workspace already reaches for when it wants an O(1)
//! recency-ordered map); this module only adds the byte-reclaim contract
//! [`EvictionPolicy::on_full`] expects on top of it.

use lru::LruCache;

use super::EvictionPolicy;
use crate::entry::{cost, CacheEntry};

/// LRU eviction backed by an unbounded `lru::LruCache` (unbounded by entry
/// count — the byte budget lives in [`crate::cache::BoundedCache`], not here).
#[derive(Debug)]
pub struct LruEviction {
    inner: LruCache<String, CacheEntry>,
}

impl LruEviction {
    /// Creates an empty LRU policy.
    pub fn new() -> Self {
        Self {
            inner: LruCache::unbounded(),
        }
    }
}

impl Default for LruEviction {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for LruEviction {
    fn insert(&mut self, key: String, entry: CacheEntry) {
        self.inner.put(key, entry);
    }

    fn update(&mut self, key: &str, entry: CacheEntry) {
        self.inner.put(key.to_owned(), entry);
    }

    fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        self.inner.get(key)
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.inner.pop(key)
    }

    fn on_full(&mut self, over_bytes: usize) -> usize {
        let mut reclaimed = 0;
        while reclaimed < over_bytes {
            match self.inner.pop_lru() {
                Some((k, v)) => reclaimed += cost(&k, &v.value),
                None => break,
            }
        }
        reclaimed
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn entry(v: &str) -> CacheEntry {
        CacheEntry::new(Bytes::from(v.to_owned()), Duration::from_secs(60))
    }

    #[test]
    fn get_promotes_to_most_recently_used() {
        let mut p = LruEviction::new();
        p.insert("a".into(), entry("1"));
        p.insert("b".into(), entry("2"));
        p.insert("c".into(), entry("3"));
        // touch "a" so it is no longer the least-recently-used entry
        assert!(p.get("a").is_some());
        // cost of each entry is 1 (key) + 1 (value) = 2 bytes; reclaim 2 bytes
        let reclaimed = p.on_full(2);
        assert_eq!(reclaimed, 2);
        assert!(p.get("b").is_none(), "b should have been the LRU victim");
        assert!(p.get("a").is_some());
        assert!(p.get("c").is_some());
    }

    #[test]
    fn on_full_drains_fully_when_entries_remain() {
        let mut p = LruEviction::new();
        for i in 0..5 {
            p.insert(format!("k{i}"), entry("v"));
        }
        let reclaimed = p.on_full(1000);
        assert_eq!(p.len(), 0);
        assert_eq!(reclaimed, 5 * cost("k0", b"v"));
    }

    #[test]
    fn remove_is_idempotent_on_absent_keys() {
        let mut p = LruEviction::new();
        assert!(p.remove("missing").is_none());
    }
}
