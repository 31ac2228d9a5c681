//! A distributed in-memory cache cluster: bounded local caches, request
//! coalescing, and consistent-hash routing across peer nodes backed by a
//! read-through data source.
//!
//! # Layout
//!
//! - [`entry`] / [`eviction`]: the unit of storage and the pluggable
//!   eviction policies (`lru`, `fifo`) that order it.
//! - [`cache`]: the byte-budgeted, TTL-expiring local cache built from those.
//! - [`singleflight`]: request coalescing, so a stampede of concurrent
//!   callers for the same key produces one underlying computation.
//! - [`hashring`]: consistent-hash routing from a key to the owning peer.
//! - [`registry`]: pluggable group membership (who owns what, right now).
//! - [`store`]: the read-through data source consulted on a local miss.
//! - [`transport`]: how nodes serve and fetch keys from one another.
//! - [`group`]: the orchestration tying all of the above into one `get(key)`.
//! - [`node`]: the builder that assembles groups into a running cluster member.
//! - [`error`]: the typed error of every boundary above.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use ringcache::node::Node;
//! use ringcache::registry::LocalRegistry;
//! use ringcache::store::FnBackingStore;
//! use ringcache::transport::HttpTransport;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(LocalRegistry::new());
//! let transport = Arc::new(HttpTransport::new());
//! let store = Arc::new(FnBackingStore::new(|key: &str| {
//!     let key = key.to_owned();
//!     async move { Ok(Some(bytes::Bytes::from(format!("value-for-{key}")))) }
//! }));
//!
//! Node::new()
//!     .group("widgets", "lru", "consistenthash", 1 << 20, Duration::from_secs(60), store)
//!     .registry(registry)
//!     .transport(transport)
//!     .start("127.0.0.1:9000")
//!     .await?;
//! # Ok(())
//! # }
//! ```

/// The unit of storage held by a [`cache::BoundedCache`]: a value plus its
/// absolute expiry instant, and the byte-cost function the cache accounts by.
pub mod entry;

/// Pluggable eviction policies (`lru`, `fifo`) an [`cache::BoundedCache`]
/// delegates ordering decisions to.
pub mod eviction;

/// The byte-budgeted, TTL-expiring local cache.
pub mod cache;

/// Error types for every component boundary.
pub mod error;

/// Request coalescing: one in-flight computation per key, shared by every
/// concurrent caller.
pub mod singleflight;

/// Consistent-hash routing from a key to the peer node that owns it.
pub mod hashring;

/// Pluggable sharding policies, named the same way eviction policies are.
pub mod sharding;

/// Pluggable group membership.
pub mod registry;

/// The read-through data source consulted on a local cache miss.
pub mod store;

/// The peer-to-peer transport: serving and fetching keys across nodes.
pub mod transport;

/// The local-cache-then-coalesce-then-route orchestration for one named group.
pub mod group;

/// The builder that assembles groups, a registry, and a transport into a
/// running cluster member.
pub mod node;

pub use cache::BoundedCache;
pub use error::{BackingStoreError, ConfigError, GroupError, RegistryError, SingleflightError, TransportError};
pub use group::Group;
pub use hashring::ConsistentHash;
pub use node::Node;
