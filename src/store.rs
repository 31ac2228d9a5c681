//! The read-through data source a node falls back to on a local cache miss
//! for a key it owns (§4.1 of the design).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackingStoreError;

/// Loads a value for a key this node owns but does not (yet) have cached.
///
/// Implementations are supplied by the embedder — a database, a remote
/// object store, a computed value — and are never assumed to be fast or
/// infallible, which is why every call to one goes through
/// [`crate::singleflight::Group`] before it ever runs.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Loads `key`, or `Ok(None)` if it genuinely does not exist upstream.
    async fn load(&self, key: &str) -> Result<Option<Bytes>, BackingStoreError>;
}

/// A `BackingStore` backed by a plain closure, for tests and simple embedders
/// that don't need a dedicated type.
pub struct FnBackingStore<F> {
    f: F,
}

impl<F> FnBackingStore<F> {
    /// Wraps `f` as a [`BackingStore`].
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> BackingStore for FnBackingStore<F>
where
    F: Fn(&str) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Option<Bytes>, BackingStoreError>> + Send,
{
    async fn load(&self, key: &str) -> Result<Option<Bytes>, BackingStoreError> {
        (self.f)(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_backing_store_delegates_to_the_closure() {
        let store = FnBackingStore::new(|key: &str| {
            let key = key.to_owned();
            async move {
                if key == "known" {
                    Ok(Some(Bytes::from_static(b"value")))
                } else {
                    Ok(None)
                }
            }
        });
        assert_eq!(store.load("known").await.unwrap(), Some(Bytes::from_static(b"value")));
        assert_eq!(store.load("other").await.unwrap(), None);
    }
}
