//! Error types for every component boundary.
//!
//! Each boundary in §7 of the design (configuration, registry, backing
//! store, transport, singleflight, the top-level group `Get`) gets its own
//! `thiserror`-derived enum rather than one grab-bag error, so callers can
//! match on exactly the failure mode they can recover from.

use std::sync::Arc;

/// A node failed to come up because its configuration was incomplete or
/// named an eviction/sharding policy this build doesn't know about.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `group()` was given an eviction policy identifier with no registered factory.
    #[error("unknown eviction policy {0:?}")]
    UnknownEvictionPolicy(String),
    /// `group()` was given a sharding policy identifier with no registered factory.
    #[error("unknown sharding policy {0:?}")]
    UnknownShardingPolicy(String),
    /// `start()` was called before any group was registered.
    #[error("no groups configured")]
    NoGroups,
    /// `start()` was called before a registry backend was attached.
    #[error("no registry configured")]
    NoRegistry,
    /// `start()` was called before a transport was attached.
    #[error("no transport configured")]
    NoTransport,
}

/// The membership registry could not answer a query for a group.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The underlying registry (or its in-process stand-in) is unreachable.
    #[error("registry unreachable: {0}")]
    Unreachable(String),
    /// `get` or `add` was called for a group that was never registered.
    #[error("unknown group {0:?}")]
    UnknownGroup(String),
}

/// The backing store failed to answer a `get`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("backing store error: {0}")]
pub struct BackingStoreError(pub String);

/// The peer transport failed to carry a request to, or a response from, a remote node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The key has no value on the peer that was asked.
    #[error("not found")]
    NotFound,
    /// The peer could not be reached at all (connection refused, DNS failure, timeout, ...).
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    /// The peer replied with a non-success status.
    #[error("peer returned status {status}: {body}")]
    BadStatus {
        /// The HTTP (or transport-equivalent) status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },
}

/// A shared, cloneable error produced by a singleflight-coalesced computation.
///
/// Every caller that arrived while the computation was in flight observes
/// the same error value; wrapping the source in an `Arc` is what makes that
/// possible without requiring every error type flowing through singleflight
/// to implement `Clone` itself.
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct SingleflightError(pub Arc<GroupError>);

/// All the ways a [`crate::group::Group::get`] call can fail.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GroupError {
    /// The registry could not supply this group's membership.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The backing store failed while loading a key this node owns.
    #[error(transparent)]
    BackingStore(#[from] BackingStoreError),
    /// The peer transport failed while fetching a key a remote node owns.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<SingleflightError> for GroupError {
    fn from(err: SingleflightError) -> Self {
        (*err.0).clone()
    }
}
