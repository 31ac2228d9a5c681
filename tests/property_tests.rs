//! Property-based checks for the invariants that hold regardless of the
//! particular sequence of operations: the byte budget is never exceeded,
//! the accounted byte total matches what is actually live, and routing is a
//! pure function of membership and key.

use std::time::Duration;

use bytes::Bytes;
use proptest::prelude::*;
use ringcache::cache::BoundedCache;
use ringcache::hashring::ConsistentHash;

fn arb_key_value() -> impl Strategy<Value = (String, Vec<u8>)> {
    ("[a-z]{1,8}", prop::collection::vec(any::<u8>(), 0..32))
}

proptest! {
    #[test]
    fn used_bytes_never_exceeds_the_budget(
        ops in prop::collection::vec(arb_key_value(), 1..64),
        max_bytes in 16usize..256,
    ) {
        let cache = BoundedCache::with_policy_name("lru", max_bytes, Duration::from_secs(3600)).unwrap();
        for (key, value) in ops {
            cache.add(&key, Bytes::from(value));
            prop_assert!(cache.used_bytes() <= max_bytes);
        }
    }

    #[test]
    fn used_bytes_matches_the_sum_of_live_entries(
        ops in prop::collection::vec(arb_key_value(), 1..64),
        max_bytes in 64usize..512,
    ) {
        let cache = BoundedCache::with_policy_name("lru", max_bytes, Duration::from_secs(3600)).unwrap();
        let mut keys: Vec<String> = Vec::new();
        for (key, value) in ops {
            if cache.add(&key, Bytes::from(value)) && !keys.contains(&key) {
                keys.push(key);
            }
        }

        let reconstructed: usize = keys
            .iter()
            .filter_map(|k| cache.get(k).map(|v| k.len() + v.len()))
            .sum();
        prop_assert_eq!(reconstructed, cache.used_bytes());
    }

    #[test]
    fn pick_is_deterministic_for_a_fixed_ring_and_membership(
        members in prop::collection::hash_set("[a-z]{1,6}", 1..12),
        key in "[a-z0-9]{1,12}",
    ) {
        let members: Vec<String> = members.into_iter().collect();
        let ring = ConsistentHash::new(50);
        let first = ring.pick(&members, &key);
        let second = ring.pick(&members, &key);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn pick_is_insensitive_to_member_list_ordering(
        members in prop::collection::hash_set("[a-z]{1,6}", 1..12),
        key in "[a-z0-9]{1,12}",
        shuffle_seed in any::<u64>(),
    ) {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let original: Vec<String> = members.into_iter().collect();
        let mut shuffled = original.clone();
        let mut rng = rand::rngs::StdRng::seed_from_u64(shuffle_seed);
        shuffled.shuffle(&mut rng);

        let ring = ConsistentHash::new(50);
        prop_assert_eq!(ring.pick(&original, &key), ring.pick(&shuffled, &key));
    }
}
