//! The orchestration at the heart of a node: the local-cache-then-coalesce-
//! then-route pipeline described in §4.6 of the design.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::BoundedCache;
use crate::error::{ConfigError, GroupError, SingleflightError, TransportError};
use crate::hashring::ConsistentHash;
use crate::registry::Registry;
use crate::singleflight::Group as Singleflight;
use crate::store::BackingStore;
use crate::transport::{ResourceLookup, Transport};

/// One named, independently-configured cache space. A node joins one or more
/// groups; every group shares the node's registry and transport but owns its
/// own cache, backing store, and eviction/sharding configuration.
pub struct Group {
    name: String,
    cache: BoundedCache,
    store: Arc<dyn BackingStore>,
    registry: Arc<dyn Registry>,
    transport: Arc<dyn Transport>,
    hash: ConsistentHash,
    self_addr: String,
    coalesce: Singleflight<Option<Bytes>, GroupError>,
}

impl Group {
    /// Builds a group. `self_addr` is this node's own address as it would
    /// appear in the registry's membership list for `name`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        eviction_policy: &str,
        sharding_policy: &str,
        max_bytes: usize,
        timeout: Duration,
        replicas: usize,
        store: Arc<dyn BackingStore>,
        registry: Arc<dyn Registry>,
        transport: Arc<dyn Transport>,
        self_addr: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let hash = crate::sharding::by_name(sharding_policy, replicas)
            .ok_or_else(|| ConfigError::UnknownShardingPolicy(sharding_policy.to_owned()))?;
        Ok(Self {
            name: name.into(),
            cache: BoundedCache::with_policy_name(eviction_policy, max_bytes, timeout)?,
            store,
            registry,
            transport,
            hash,
            self_addr: self_addr.into(),
            coalesce: Singleflight::new(),
        })
    }

    /// The group's name, as registered with the membership registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches `key`: a local cache hit returns immediately; otherwise a
    /// single coalesced lookup decides, from current membership, whether to
    /// load locally or forward to the owning peer.
    ///
    /// Takes `self` behind an `Arc` because the coalesced computation is
    /// boxed and shared across every waiter (`futures::future::Shared`
    /// requires `'static`); a plain `&self` borrow cannot outlive this call.
    pub async fn get(self: &Arc<Self>, key: &str) -> Result<Option<Bytes>, GroupError> {
        if let Some(value) = self.cache.get(key) {
            tracing::trace!(group = %self.name, key, "local cache hit");
            return Ok(Some(value));
        }

        let this = Arc::clone(self);
        let result = self
            .coalesce
            .do_work(key, {
                let key = key.to_owned();
                move || async move { this.resolve(key).await }
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(shared) => Err(SingleflightError(shared).into()),
        }
    }

    async fn resolve(&self, key: String) -> Result<Option<Bytes>, GroupError> {
        let members = self.registry.members(&self.name).await?;
        let owner = self.hash.pick(&members, &key);

        match owner {
            Some(ref node) if node != &self.self_addr => {
                match self.transport.get_from_remote(node, &self.name, &key).await {
                    Ok(value) => Ok(Some(value)),
                    Err(TransportError::NotFound) => Ok(None),
                    Err(e) => Err(GroupError::from(e)),
                }
            }
            // No owner (empty membership) or we are the owner: load locally.
            _ => self.get_from_local(&key).await,
        }
    }

    async fn get_from_local(&self, key: &str) -> Result<Option<Bytes>, GroupError> {
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value));
        }
        let Some(value) = self.store.load(key).await? else {
            return Ok(None);
        };
        self.cache.add(key, value.clone());
        Ok(Some(value))
    }
}

#[async_trait]
impl ResourceLookup for Group {
    async fn get_local(&self, group: &str, key: &str) -> Result<Option<Bytes>, crate::error::TransportError> {
        if group != self.name {
            return Ok(None);
        }
        self.get_from_local(key)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LocalRegistry;
    use crate::store::FnBackingStore;
    use crate::transport::Transport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct NoopTransport;

    #[async_trait]
    impl Transport for NoopTransport {
        async fn get_from_remote(&self, _addr: &str, _group: &str, _key: &str) -> Result<Bytes, TransportError> {
            Err(TransportError::NotFound)
        }
        async fn serve(&self, _addr: &str, _resource: Arc<dyn ResourceLookup>) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_node_loads_from_backing_store_and_caches() {
        let registry = Arc::new(LocalRegistry::new());
        let _handle = registry.join("g", "self").await.unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let loads_inner = Arc::clone(&loads);
        let store = Arc::new(FnBackingStore::new(move |key: &str| {
            loads_inner.fetch_add(1, Ordering::SeqCst);
            let key = key.to_owned();
            async move {
                Ok(if key == "k" {
                    Some(Bytes::from_static(b"v"))
                } else {
                    None
                })
            }
        }));

        let group = Arc::new(
            Group::new(
                "g",
                "lru",
                "consistenthash",
                1024,
                Duration::from_secs(60),
                10,
                store,
                registry,
                Arc::new(NoopTransport),
                "self",
            )
            .unwrap(),
        );

        assert_eq!(group.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));
        assert_eq!(group.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));
        assert_eq!(loads.load(Ordering::SeqCst), 1, "second get should hit the local cache");
    }

    #[tokio::test]
    async fn missing_key_resolves_to_none_without_caching() {
        let registry = Arc::new(LocalRegistry::new());
        let _handle = registry.join("g", "self").await.unwrap();
        let store = Arc::new(FnBackingStore::new(|_: &str| async { Ok(None) }));

        let group = Arc::new(
            Group::new(
                "g",
                "lru",
                "consistenthash",
                1024,
                Duration::from_secs(60),
                10,
                store,
                registry,
                Arc::new(NoopTransport),
                "self",
            )
            .unwrap(),
        );

        assert_eq!(group.get("missing").await.unwrap(), None);
        assert_eq!(group.cache.len(), 0);
    }

    #[tokio::test]
    async fn unknown_sharding_policy_is_a_config_error() {
        let registry = Arc::new(LocalRegistry::new());
        let store = Arc::new(FnBackingStore::new(|_: &str| async { Ok(None) }));
        let result = Group::new(
            "g",
            "lru",
            "rendezvous",
            1024,
            Duration::from_secs(60),
            10,
            store,
            registry,
            Arc::new(NoopTransport),
            "self",
        );
        match result {
            Err(ConfigError::UnknownShardingPolicy(name)) => assert_eq!(name, "rendezvous"),
            _ => panic!("expected UnknownShardingPolicy"),
        }
    }
}
