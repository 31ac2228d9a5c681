//! The bounded local cache: a byte-budgeted, TTL-expiring wrapper around a
//! pluggable [`EvictionPolicy`].
//!
//! There is no background expiry sweeper — expiry is checked lazily on
//! `get`, by design: the hot path stays free of timers, and memory is
//! bounded only by the byte budget (§4.2 of the design).

use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::entry::{cost, CacheEntry};
use crate::error::ConfigError;
use crate::eviction::{self, EvictionPolicy};

struct State {
    policy: Box<dyn EvictionPolicy>,
    used_bytes: usize,
}

/// A thread-safe, byte-bounded cache with per-entry TTL.
///
/// All state — the key→entry map, the eviction ordering, and the running
/// byte total — is guarded by a single short-held mutex. Nothing that can
/// block (I/O, the backing store, the transport) is ever called while that
/// mutex is held; see §5 of the design for the full concurrency contract.
#[derive(Debug)]
pub struct BoundedCache {
    max_bytes: usize,
    timeout: Duration,
    state: Mutex<State>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("len", &self.policy.len())
            .field("used_bytes", &self.used_bytes)
            .finish()
    }
}

impl BoundedCache {
    /// Builds a cache with an explicit policy instance.
    pub fn new(max_bytes: usize, timeout: Duration, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            max_bytes,
            timeout,
            state: Mutex::new(State {
                policy,
                used_bytes: 0,
            }),
        }
    }

    /// Builds a cache selecting its policy by the names in §6 (`"lru"`, `"fifo"`).
    pub fn with_policy_name(
        policy_name: &str,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let policy = eviction::by_name(policy_name)
            .ok_or_else(|| ConfigError::UnknownEvictionPolicy(policy_name.to_owned()))?;
        Ok(Self::new(max_bytes, timeout, policy))
    }

    /// Inserts or updates `key`. Returns `false`, with no state change, if the
    /// entry's own cost (`len(key) + len(value)`) exceeds the byte budget in isolation.
    pub fn add(&self, key: &str, value: Bytes) -> bool {
        let total_cost = cost(key, &value);
        if total_cost > self.max_bytes {
            tracing::debug!(key, total_cost, max_bytes = self.max_bytes, "add rejected: over budget in isolation");
            return false;
        }

        let mut state = self.state.lock();
        let existing_len = state.policy.get(key).map(|e| e.value.len());
        let delta: i64 = match existing_len {
            Some(old_len) => value.len() as i64 - old_len as i64,
            None => total_cost as i64,
        };

        let entry = CacheEntry::new(value, self.timeout);
        if existing_len.is_some() {
            state.policy.update(key, entry);
        } else {
            state.policy.insert(key.to_owned(), entry);
        }

        state.used_bytes = usize::try_from((state.used_bytes as i64 + delta).max(0)).unwrap_or(0);
        if state.used_bytes > self.max_bytes {
            let over = state.used_bytes - self.max_bytes;
            let reclaimed = state.policy.on_full(over);
            state.used_bytes -= reclaimed;
            tracing::debug!(over, reclaimed, "evicted to stay within byte budget");
        }
        true
    }

    /// Looks up `key`. A live entry is returned; an absent or lazily-expired
    /// one yields `None` (an expired entry is removed from state as a side effect).
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let expired = match state.policy.get(key) {
            None => return None,
            Some(entry) if entry.is_live(now) => {
                let value = entry.value.clone();
                tracing::trace!(key, "cache hit");
                return Some(value);
            }
            Some(_) => true,
        };
        debug_assert!(expired);
        if let Some(removed) = state.policy.remove(key) {
            let freed = cost(key, &removed.value);
            state.used_bytes = state.used_bytes.saturating_sub(freed);
            tracing::trace!(key, "lazily expired on read");
        }
        None
    }

    /// Current total bytes accounted for live entries.
    pub fn used_bytes(&self) -> usize {
        self.state.lock().used_bytes
    }

    /// The configured byte budget.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Number of live entries tracked by the eviction policy.
    pub fn len(&self) -> usize {
        self.state.lock().policy.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
