//! The peer-to-peer boundary: how one node asks another for a key it owns,
//! and how a node answers that ask for a group it owns (§4.7 of the design).
//!
//! The reference transport is plain HTTP: `GET /{group}/{key}` where `key` is
//! percent-encoded into a single path segment, so a key containing a literal
//! slash still round-trips correctly instead of being truncated at it. Any
//! request that doesn't resolve to exactly that shape gets `400 Bad Request`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use crate::error::TransportError;

/// The host-side hook a [`Transport`] calls to answer an inbound request for
/// `(group, key)`. [`crate::group::Group::get_from_remote`] is one implementor;
/// tests can stub this directly.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// Answers a request for `key` in `group`, without involving the peer
    /// network again (this call must only ever serve from local state).
    async fn get_local(&self, group: &str, key: &str) -> Result<Option<Bytes>, TransportError>;
}

/// Carries requests to, and serves requests from, peer nodes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `key` in `group` from the node at `addr`.
    async fn get_from_remote(&self, addr: &str, group: &str, key: &str) -> Result<Bytes, TransportError>;

    /// Binds `addr` and serves inbound peer requests by dispatching to `resource`
    /// until the returned future is dropped or the process exits.
    async fn serve(&self, addr: &str, resource: Arc<dyn ResourceLookup>) -> Result<(), TransportError>;
}

/// The reference HTTP transport: `reqwest` as the client half, `axum` as the
/// server half.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with a fresh `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_from_remote(&self, addr: &str, group: &str, key: &str) -> Result<Bytes, TransportError> {
        let encoded_key = urlencoding::encode(key);
        let url = format!("http://{addr}/{group}/{encoded_key}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::OK => resp
                .bytes()
                .await
                .map_err(|e| TransportError::Unreachable(e.to_string())),
            reqwest::StatusCode::NOT_FOUND => Err(TransportError::NotFound),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TransportError::BadStatus {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn serve(&self, addr: &str, resource: Arc<dyn ResourceLookup>) -> Result<(), TransportError> {
        let app = Router::new()
            .route("/:group/:key", get(handle_get))
            .fallback(handle_malformed_path)
            .with_state(resource);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        tracing::info!(addr, "transport listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))
    }
}

async fn handle_get(
    State(resource): State<Arc<dyn ResourceLookup>>,
    Path((group, encoded_key)): Path<(String, String)>,
) -> Response {
    let key = match urlencoding::decode(&encoded_key) {
        Ok(k) => k.into_owned(),
        Err(_) => return (StatusCode::BAD_REQUEST, "bad key encoding").into_response(),
    };

    match resource.get_local(&group, &key).await {
        Ok(Some(value)) => (StatusCode::OK, value).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("no such entry: {group}/{key}")).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Answers any request that doesn't resolve to exactly `/{group}/{key}`
/// (missing a segment, an extra one, or the bare root) with `400 Bad Request`
/// rather than axum's default unmatched-route `404`.
async fn handle_malformed_path() -> Response {
    (StatusCode::BAD_REQUEST, "expected path /{group}/{key}").into_response()
}
