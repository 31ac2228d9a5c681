//! Synthetic traffic generation: which key a request asks for, and how big
//! the value behind it is. A small popularity-skewed generator — most
//! traffic lands on a minority of keys — reusable across simulation runs
//! rather than a one-off script.

use rand::Rng;

/// Draws keys from a fixed-size key space with a popularity skew: a small
/// fraction of keys (`popular_keys_fraction`) receives most of the traffic
/// (`popular_traffic_fraction`), the rest is spread uniformly over the tail.
#[derive(Debug, Clone)]
pub struct KeyPopularityGenerator {
    unique_keys: usize,
    popular_keys: usize,
    popular_traffic_fraction: f64,
}

impl KeyPopularityGenerator {
    pub fn new(unique_keys: usize, popular_keys_fraction: f64, popular_traffic_fraction: f64) -> Self {
        let popular_keys = ((unique_keys as f64 * popular_keys_fraction).round() as usize).max(1);
        Self {
            unique_keys: unique_keys.max(1),
            popular_keys: popular_keys.min(unique_keys.max(1)),
            popular_traffic_fraction,
        }
    }

    /// Draws the next key for a request.
    pub fn next_key(&self, rng: &mut impl Rng) -> String {
        let id = if rng.gen_bool(self.popular_traffic_fraction) {
            rng.gen_range(0..self.popular_keys)
        } else {
            rng.gen_range(self.popular_keys..self.unique_keys.max(self.popular_keys + 1))
        };
        format!("key-{id}")
    }
}

/// Derives a value's byte length deterministically from its key, so every
/// node's backing store produces the same payload for the same key without
/// needing a data source shared across nodes.
pub fn value_for_key(key: &str, min_size: usize, max_size: usize) -> bytes::Bytes {
    let span = (max_size.saturating_sub(min_size)).max(1) as u32;
    let size = min_size + (crc32fast::hash(key.as_bytes()) % span) as usize;
    bytes::Bytes::from(vec![b'v'; size])
}
