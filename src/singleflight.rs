//! Request coalescing: at most one in-flight computation per key, shared by
//! every caller whose arrival overlaps it (§4.3 of the design).
//!
//! Generic over the result and error type so the same primitive backs both
//! the top-level [`crate::group::Group::get`] pipeline (coalescing on
//! `Bytes`) and the registry's first-read stampede protection (coalescing on
//! a membership list, §4.5).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

/// A singleflight result, shareable across every waiter attached to the same
/// in-flight computation.
///
/// `futures::future::Shared` requires its output to be `Clone`; wrapping the
/// error in an `Arc` is what lets every waiter observe an identical,
/// cheaply-cloned outcome even when the underlying error type isn't `Clone`
/// on its own.
pub type SharedResult<T, E> = Result<T, Arc<E>>;

type InFlight<T, E> = Shared<BoxFuture<'static, SharedResult<T, E>>>;

/// Coalesces concurrent callers of a unit of async work keyed by a string.
///
/// The map guarding in-flight slots is a plain [`parking_lot::Mutex`]: it is
/// only ever held across a hash-map lookup/insert/remove, never across the
/// `.await` of the work itself, matching the "never held across work"
/// requirement in the design.
#[derive(Debug)]
pub struct Group<T, E> {
    calls: Mutex<HashMap<String, InFlight<T, E>>>,
}

impl<T, E> Default for Group<T, E> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T, E> Group<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates an empty singleflight group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` for `key`, or attaches to an already in-flight computation
    /// for the same key. Every caller whose arrival overlaps the same
    /// computation observes the identical `(value, error)` outcome.
    ///
    /// Every map access is a plain (non-async) method, so a `parking_lot`
    /// guard (`!Send` by design) never becomes part of this `async fn`'s
    /// generated state across an `.await` point.
    pub async fn do_work<F, Fut>(&self, key: &str, work: F) -> SharedResult<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(in_flight) = self.lookup(key) {
            tracing::trace!(key, "attaching to in-flight singleflight call");
            return in_flight.await;
        }

        let shared: InFlight<T, E> = async move { work().await.map_err(Arc::new) }.boxed().shared();

        // A concurrent caller may have inserted first between our lookup
        // above and this insert; if so, defer to it so there is still only
        // one winning computation for this key.
        if let Some(in_flight) = self.insert_if_absent(key, shared.clone()) {
            return in_flight.await;
        }

        let result = shared.await;
        self.calls.lock().remove(key);
        result
    }

    fn lookup(&self, key: &str) -> Option<InFlight<T, E>> {
        self.calls.lock().get(key).cloned()
    }

    fn insert_if_absent(&self, key: &str, shared: InFlight<T, E>) -> Option<InFlight<T, E>> {
        let mut calls = self.calls.lock();
        if let Some(existing) = calls.get(key) {
            return Some(existing.clone());
        }
        calls.insert(key.to_owned(), shared);
        None
    }

    /// Number of keys with a computation currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.calls.lock().len()
    }
}
