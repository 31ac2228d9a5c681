//! Consistent-hash routing: maps a key to the owning peer node, with minimal
//! remapping as membership changes (§4.4 of the design).

use parking_lot::RwLock;
use std::sync::Arc;

/// Default number of virtual replicas per real node.
pub const DEFAULT_REPLICAS: usize = 100;

/// An immutable, fully-built hash ring: a sorted index of virtual-node
/// positions, each tagged with the real node address that owns it.
///
/// Rings are swapped in wholesale (never mutated in place), so a reader
/// holding an `Arc<Ring>` never observes a partially constructed one, even
/// while a rebuild is concurrently in progress.
#[derive(Debug)]
struct Ring {
    /// Sorted virtual-node positions.
    positions: Vec<u32>,
    /// `positions[i]` is owned by `owners[i]`.
    owners: Vec<String>,
    /// The membership this ring was built from, used to detect no-op rebuilds.
    fingerprint: Vec<String>,
}

impl Ring {
    fn build(members: &[String], replicas: usize) -> Self {
        let mut pairs: Vec<(u32, String)> = Vec::with_capacity(members.len() * replicas);
        for member in members {
            for i in 0..replicas {
                let h = crc32(format!("{member}{i}").as_bytes());
                pairs.push((h, member.clone()));
            }
        }
        // Sort by position; a duplicate position keeps whichever member sorts
        // last into that slot, which is an acceptable load-balance
        // perturbation, not a correctness issue (§4.4).
        pairs.sort_by_key(|(h, _)| *h);
        let positions = pairs.iter().map(|(h, _)| *h).collect();
        let owners = pairs.into_iter().map(|(_, m)| m).collect();
        let mut fingerprint = members.to_vec();
        fingerprint.sort();
        Self {
            positions,
            owners,
            fingerprint,
        }
    }

    fn pick(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let k = crc32(key.as_bytes());
        let idx = match self.positions.binary_search(&k) {
            Ok(i) => i,
            Err(i) => i % self.positions.len(),
        };
        Some(&self.owners[idx])
    }

    fn matches(&self, members: &[String]) -> bool {
        let mut sorted = members.to_vec();
        sorted.sort();
        self.fingerprint == sorted
    }
}

fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// A consistent-hash router over a node membership that changes over time.
///
/// The ring is rebuilt only when the membership actually changes (compared
/// by a sorted fingerprint) and is published atomically behind an
/// `Arc<Ring>` under a reader-writer lock, so concurrent `pick` calls never
/// observe a half-built ring.
#[derive(Debug)]
pub struct ConsistentHash {
    replicas: usize,
    ring: RwLock<Arc<Ring>>,
}

impl ConsistentHash {
    /// Creates a router with the given replica factor (§4.4 default is 100).
    pub fn new(replicas: usize) -> Self {
        Self {
            replicas,
            ring: RwLock::new(Arc::new(Ring::build(&[], replicas))),
        }
    }

    /// Picks the owning node for `key` given the current `members`.
    ///
    /// Returns `None` if `members` is empty. The ring is rebuilt in place
    /// (and published atomically) if `members` differs from the last build.
    pub fn pick(&self, members: &[String], key: &str) -> Option<String> {
        if members.is_empty() {
            return None;
        }

        {
            let ring = self.ring.read();
            if ring.matches(members) {
                return ring.pick(key).map(str::to_owned);
            }
        }

        let rebuilt = Arc::new(Ring::build(members, self.replicas));
        let picked = rebuilt.pick(key).map(str::to_owned);
        *self.ring.write() = rebuilt;
        picked
    }
}

impl Default for ConsistentHash {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn empty_membership_has_no_owner() {
        let ring = ConsistentHash::new(10);
        assert_eq!(ring.pick(&[], "k"), None);
    }

    #[test]
    fn pick_is_a_pure_function_of_sorted_members_and_key() {
        let ring = ConsistentHash::new(50);
        let a = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let b = vec!["a".to_string(), "c".to_string(), "b".to_string()];
        let pick_a = ring.pick(&a, "hello");
        let pick_b = ring.pick(&b, "hello");
        assert_eq!(pick_a, pick_b);
    }

    #[test]
    fn redistribution_on_membership_growth_is_roughly_proportional() {
        let ring = ConsistentHash::new(100);
        let three = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let four = vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()];

        let mut rng = rand::thread_rng();
        let keys: Vec<String> = (0..10_000).map(|_| format!("key-{}", rng.gen::<u64>())).collect();

        let mut moved = 0;
        for key in &keys {
            let before = ring.pick(&three, key);
            let after = ring.pick(&four, key);
            if before != after {
                moved += 1;
            }
        }

        let fraction = moved as f64 / keys.len() as f64;
        // Expect roughly 1/(M+1) = 25% of keys to move; allow a generous band.
        assert!(
            (0.15..0.35).contains(&fraction),
            "expected ~25% of keys to move, got {:.1}%",
            fraction * 100.0
        );
    }

    #[test]
    fn unchanged_membership_reuses_the_ring() {
        let ring = ConsistentHash::new(20);
        let members = vec!["x".to_string(), "y".to_string()];
        let first = ring.pick(&members, "k1");
        let second = ring.pick(&members, "k1");
        assert_eq!(first, second);
    }
}
