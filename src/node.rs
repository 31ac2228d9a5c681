//! The top-level builder a process uses to stand up a cluster member: attach
//! groups, a registry, a transport, then start serving (§4.8 of the design).
//!
//! Configuration errors (an unknown eviction policy, a missing registry) are
//! deferred rather than returned from the builder calls themselves: they are
//! recorded and only surface from [`Node::start`]. That lets the builder
//! read as an ordinary fluent chain instead of threading `?` through every
//! step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, TransportError};
use crate::group::Group;
use crate::registry::{MembershipHandle, Registry};
use crate::store::BackingStore;
use crate::transport::{ResourceLookup, Transport};

/// Builds and starts a cluster node.
///
/// Example:
/// ```no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use ringcache::node::Node;
/// # use ringcache::registry::LocalRegistry;
/// # use ringcache::transport::HttpTransport;
/// # use ringcache::store::FnBackingStore;
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(LocalRegistry::new());
/// let transport = Arc::new(HttpTransport::new());
/// let store = Arc::new(FnBackingStore::new(|_: &str| async { Ok(None) }));
///
/// Node::new()
///     .group("widgets", "lru", "consistenthash", 1 << 20, Duration::from_secs(60), store)
///     .registry(registry)
///     .transport(transport)
///     .start("127.0.0.1:9000")
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Node {
    group_specs: Vec<PendingGroup>,
    registry: Option<Arc<dyn Registry>>,
    transport: Option<Arc<dyn Transport>>,
    replicas: usize,
    err: Option<ConfigError>,
}

struct PendingGroup {
    name: String,
    eviction_policy: String,
    sharding_policy: String,
    max_bytes: usize,
    timeout: Duration,
    store: Arc<dyn BackingStore>,
}

impl Node {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            group_specs: Vec::new(),
            registry: None,
            transport: None,
            replicas: crate::hashring::DEFAULT_REPLICAS,
            err: None,
        }
    }

    /// Registers a cache group. Does not fail immediately on an unknown
    /// `eviction_policy` or `sharding_policy`; the error surfaces from
    /// [`Node::start`].
    #[allow(clippy::too_many_arguments)]
    pub fn group(
        mut self,
        name: impl Into<String>,
        eviction_policy: impl Into<String>,
        sharding_policy: impl Into<String>,
        max_bytes: usize,
        timeout: Duration,
        store: Arc<dyn BackingStore>,
    ) -> Self {
        self.group_specs.push(PendingGroup {
            name: name.into(),
            eviction_policy: eviction_policy.into(),
            sharding_policy: sharding_policy.into(),
            max_bytes,
            timeout,
            store,
        });
        self
    }

    /// Sets the number of virtual replicas the consistent-hash ring uses
    /// per member (default [`crate::hashring::DEFAULT_REPLICAS`]).
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Attaches the membership registry every group will consult.
    pub fn registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Attaches the peer transport every group will use to serve and fetch.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds every configured group, joins the registry under `addr`, and
    /// serves inbound peer traffic until the server future completes or errors.
    ///
    /// Any deferred configuration error, a missing registry or transport, or
    /// an empty group list is returned here rather than earlier. Blocks for
    /// the lifetime of the node; see [`Node::spawn`] for a handle that keeps
    /// running in the background and exposes its groups for in-process use.
    pub async fn start(self, addr: &str) -> Result<(), NodeStartError> {
        let running = self.spawn(addr).await?;
        running.join().await
    }

    /// Like [`Node::start`], but serves in a background task and returns a
    /// handle to it instead of blocking. The node stops serving (and its
    /// registry membership is released) when the handle is dropped.
    pub async fn spawn(self, addr: &str) -> Result<RunningNode, NodeStartError> {
        if let Some(err) = self.err {
            return Err(NodeStartError::Config(err));
        }
        if self.group_specs.is_empty() {
            return Err(NodeStartError::Config(ConfigError::NoGroups));
        }
        let registry = self.registry.ok_or(NodeStartError::Config(ConfigError::NoRegistry))?;
        let transport = self.transport.ok_or(NodeStartError::Config(ConfigError::NoTransport))?;

        let mut groups = HashMap::new();
        let mut handles = Vec::new();
        for spec in self.group_specs {
            let group = Arc::new(
                Group::new(
                    spec.name.clone(),
                    &spec.eviction_policy,
                    &spec.sharding_policy,
                    spec.max_bytes,
                    spec.timeout,
                    self.replicas,
                    spec.store,
                    Arc::clone(&registry),
                    Arc::clone(&transport),
                    addr,
                )
                .map_err(NodeStartError::Config)?,
            );
            let handle = registry
                .join(&spec.name, addr)
                .await
                .map_err(NodeStartError::Registry)?;
            handles.push(handle);
            groups.insert(spec.name, group);
        }

        let router = Arc::new(GroupRouter {
            groups: groups.clone(),
        });
        tracing::info!(addr, groups = router.groups.len(), "node starting");
        let addr_owned = addr.to_owned();
        let serve_task = tokio::spawn(async move { transport.serve(&addr_owned, router).await });

        Ok(RunningNode {
            groups,
            serve_task: Some(serve_task),
            _membership: handles,
        })
    }
}

/// A node whose server loop is running in a background task.
///
/// Dropping this handle aborts the server task and releases every group's
/// registry membership (via the held [`MembershipHandle`]s).
pub struct RunningNode {
    groups: HashMap<String, Arc<Group>>,
    serve_task: Option<tokio::task::JoinHandle<Result<(), TransportError>>>,
    _membership: Vec<MembershipHandle>,
}

impl RunningNode {
    /// The group this node runs under `name`, for calling `.get()` on directly
    /// without going through the network transport.
    pub fn group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(name).cloned()
    }

    /// Waits for the server loop to end (normally only on error, or never).
    pub async fn join(mut self) -> Result<(), NodeStartError> {
        match self.serve_task.take() {
            Some(task) => match task.await {
                Ok(result) => result.map_err(NodeStartError::Transport),
                Err(_) => Ok(()),
            },
            None => Ok(()),
        }
    }
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that can prevent (or end) a node's run.
#[derive(Debug, thiserror::Error)]
pub enum NodeStartError {
    /// Configuration was incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The registry rejected this node joining a group.
    #[error("registry join failed: {0}")]
    Registry(crate::error::RegistryError),
    /// The transport failed to bind or serve.
    #[error("transport failed: {0}")]
    Transport(crate::error::TransportError),
}

struct GroupRouter {
    groups: HashMap<String, Arc<Group>>,
}

#[async_trait::async_trait]
impl ResourceLookup for GroupRouter {
    async fn get_local(&self, group: &str, key: &str) -> Result<Option<bytes::Bytes>, crate::error::TransportError> {
        match self.groups.get(group) {
            Some(g) => ResourceLookup::get_local(g.as_ref(), group, key).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LocalRegistry;
    use crate::store::FnBackingStore;

    #[tokio::test]
    async fn start_without_groups_is_a_config_error() {
        let registry = Arc::new(LocalRegistry::new());
        let transport = Arc::new(crate::transport::HttpTransport::new());
        let err = Node::new()
            .registry(registry)
            .transport(transport)
            .start("127.0.0.1:0")
            .await
            .unwrap_err();
        assert!(matches!(err, NodeStartError::Config(ConfigError::NoGroups)));
    }

    #[tokio::test]
    async fn start_without_registry_is_a_config_error() {
        let store = Arc::new(FnBackingStore::new(|_: &str| async { Ok(None) }));
        let transport = Arc::new(crate::transport::HttpTransport::new());
        let err = Node::new()
            .group("g", "lru", "consistenthash", 1024, Duration::from_secs(60), store)
            .transport(transport)
            .start("127.0.0.1:0")
            .await
            .unwrap_err();
        assert!(matches!(err, NodeStartError::Config(ConfigError::NoRegistry)));
    }
}
