//! Group membership: which peer nodes currently participate in a named group,
//! and how a node learns about that set changing (§4.5 of the design).
//!
//! No ZooKeeper (or etcd/consul) client lives in this crate's dependency
//! stack, so [`LocalRegistry`] is an in-process stand-in: nodes register an
//! ephemeral membership the way a ZK client registers an ephemeral znode,
//! and other nodes observe membership changes through a broadcast channel
//! rather than a watch callback. A networked registry (etcd, consul)
//! implements the same [`Registry`] trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::RegistryError;
use crate::singleflight::Group as Singleflight;

/// Queries and maintains group membership.
#[async_trait]
pub trait Registry: std::fmt::Debug + Send + Sync {
    /// Returns the current membership of `group`, sorted for determinism.
    ///
    /// Concurrent first-reads for the same group while no cached snapshot
    /// exists yet must be coalesced into a single underlying lookup (§4.5).
    async fn members(&self, group: &str) -> Result<Vec<String>, RegistryError>;

    /// Registers `node` as a member of `group` for as long as the returned
    /// handle is held. Dropping the handle deregisters the node.
    async fn join(&self, group: &str, node: &str) -> Result<MembershipHandle, RegistryError>;
}

/// An RAII membership grant: the node is a member of its group only while
/// this handle is alive. Dropping it (explicitly via [`MembershipHandle::release`]
/// or implicitly at end of scope) deregisters the node, mirroring the Go
/// reference's ephemeral znode lifetime without needing a session heartbeat.
pub struct MembershipHandle {
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl MembershipHandle {
    fn new(on_drop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Deregisters immediately rather than waiting for drop.
    pub fn release(mut self) {
        if let Some(f) = self.on_drop.take() {
            f();
        }
    }
}

impl std::fmt::Debug for MembershipHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipHandle").finish()
    }
}

impl Drop for MembershipHandle {
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f();
        }
    }
}

#[derive(Debug)]
struct Inner {
    groups: HashMap<String, Vec<String>>,
}

impl Inner {
    fn leave(&mut self, group: &str, node: &str) {
        if let Some(members) = self.groups.get_mut(group) {
            members.retain(|m| m != node);
        }
    }
}

/// An in-process [`Registry`]: every node in the process shares one
/// `LocalRegistry` (or one reachable over a loopback clone), and membership
/// changes are broadcast to anyone subscribed via [`LocalRegistry::watch`].
#[derive(Debug)]
pub struct LocalRegistry {
    inner: Arc<Mutex<Inner>>,
    changes: broadcast::Sender<String>,
    stampede_guard: Singleflight<Vec<String>, RegistryError>,
}

impl LocalRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                groups: HashMap::new(),
            })),
            changes,
            stampede_guard: Singleflight::new(),
        }
    }

    /// Subscribes to group-membership change notifications. Each message is
    /// the name of the group whose membership just changed.
    pub fn watch(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    fn snapshot(&self, group: &str) -> Option<Vec<String>> {
        self.inner.lock().groups.get(group).cloned()
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for LocalRegistry {
    async fn members(&self, group: &str) -> Result<Vec<String>, RegistryError> {
        if let Some(members) = self.snapshot(group) {
            return Ok(members);
        }

        // No cached snapshot yet: any number of concurrent first-readers of
        // this group coalesce onto one underlying lookup. A networked
        // registry would make a real remote call here; the in-process
        // stand-in has nothing to fetch, but the coalescing path is
        // exercised identically. The resolved membership (including an empty
        // one, for a group nobody has joined yet) is written back into
        // `inner.groups` so every later call is a plain cached read instead
        // of repeating the stampede-guard dance.
        let inner = Arc::clone(&self.inner);
        let group_owned = group.to_owned();
        let result = self
            .stampede_guard
            .do_work(group, move || async move {
                let members = inner.lock().groups.entry(group_owned).or_default().clone();
                Ok::<_, RegistryError>(members)
            })
            .await
            .map_err(|e| (*e).clone())?;
        Ok(result)
    }

    async fn join(&self, group: &str, node: &str) -> Result<MembershipHandle, RegistryError> {
        {
            let mut inner = self.inner.lock();
            let members = inner.groups.entry(group.to_owned()).or_default();
            if !members.iter().any(|m| m == node) {
                members.push(node.to_owned());
                members.sort();
            }
        }
        let _ = self.changes.send(group.to_owned());

        let inner = Arc::clone(&self.inner);
        let group_owned = group.to_owned();
        let node_owned = node.to_owned();
        let changes = self.changes.clone();
        Ok(MembershipHandle::new(move || {
            inner.lock().leave(&group_owned, &node_owned);
            tracing::debug!(group = %group_owned, node = %node_owned, "membership released");
            let _ = changes.send(group_owned);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_then_members_reflects_the_node() {
        let registry = LocalRegistry::new();
        let _handle = registry.join("g", "node-a").await.unwrap();
        let members = registry.members("g").await.unwrap();
        assert_eq!(members, vec!["node-a".to_string()]);
    }

    #[tokio::test]
    async fn dropping_the_handle_deregisters_the_node() {
        let registry = LocalRegistry::new();
        let handle = registry.join("g", "node-a").await.unwrap();
        handle.release();
        assert_eq!(registry.members("g").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn unregistered_group_resolves_to_empty_membership() {
        let registry = LocalRegistry::new();
        assert_eq!(registry.members("absent").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn an_unjoined_groups_empty_snapshot_is_cached_after_the_first_read() {
        let registry = LocalRegistry::new();
        registry.members("absent").await.unwrap();
        assert_eq!(registry.inner.lock().groups.get("absent"), Some(&Vec::new()));
        assert_eq!(registry.stampede_guard.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn watch_observes_membership_changes() {
        let registry = LocalRegistry::new();
        let mut rx = registry.watch();
        registry.join("g", "n1").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "g");
    }
}
