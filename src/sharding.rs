//! Pluggable sharding policies: how a group maps a key to the node that owns it.
//!
//! Mirrors [`crate::eviction::by_name`]'s dispatch: a group names its router
//! the same way it names its eviction policy, and an unrecognized name is a
//! configuration error rather than a silent default.

use crate::hashring::ConsistentHash;

/// Constructs the router backing a named sharding policy, with `replicas`
/// virtual nodes per member.
///
/// Only `"consistenthash"` is registered today. There is exactly one router
/// implementation, but the name still round-trips through the same
/// validation path as eviction policies, so a typo is caught at
/// configuration time instead of silently falling back to a default.
pub fn by_name(name: &str, replicas: usize) -> Option<ConsistentHash> {
    match name {
        "consistenthash" => Some(ConsistentHash::new(replicas)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_policy_name_accepted() {
        assert!(by_name("consistenthash", 10).is_some());
    }

    #[test]
    fn unknown_policy_name_rejected() {
        assert!(by_name("rendezvous", 10).is_none());
    }
}
