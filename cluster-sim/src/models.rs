//! Data models for the cluster simulation: what a run is configured with,
//! and what it reports back.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Everything a single simulation run needs.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of in-process nodes to stand up.
    pub nodes: usize,
    /// Total number of `get` requests to drive through the cluster.
    pub requests: usize,
    /// Size of the key space requests are drawn from.
    pub unique_keys: usize,
    /// Fraction of the key space treated as "popular" (receives most traffic).
    pub popular_keys_fraction: f64,
    /// Fraction of requests that land on a popular key.
    pub popular_traffic_fraction: f64,
    /// Virtual replicas per node on the consistent-hash ring.
    pub replicas: usize,
    /// Where to write a per-node CSV breakdown, if requested.
    pub output_csv: Option<PathBuf>,
}

/// How a single request was ultimately satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The entry node already had the value cached locally.
    LocalHit,
    /// The entry node owned the key but had to load it from its backing store.
    LocalLoad,
    /// The entry node routed the request to a peer over the HTTP transport.
    RemoteFetch,
}

/// Per-node counters accumulated over a run.
#[derive(Debug, Clone, Default)]
pub struct NodeCounters {
    pub addr: String,
    /// Requests for which this node was the entry point.
    pub entries_served: usize,
    /// Times this node had to load a key from its own backing store.
    pub loads: usize,
    /// Times this node forwarded a request to a peer.
    pub remote_fetches_issued: usize,
}

/// The full outcome of a simulation run, ready to print or export.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub total_requests: usize,
    pub local_hits: usize,
    pub local_loads: usize,
    pub remote_fetches: usize,
    pub duration: Duration,
    pub per_node: Vec<NodeCounters>,
    /// Fraction of the sampled key space that would change owner if one more
    /// node joined the ring, holding every other member fixed.
    pub redistribution_on_growth: f64,
}

impl SimulationResult {
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.local_hits as f64 / self.total_requests as f64
    }
}

/// One row of the optional per-node CSV export.
#[derive(Debug, Serialize)]
pub struct NodeCsvRow {
    pub addr: String,
    pub entries_served: usize,
    pub loads: usize,
    pub remote_fetches_issued: usize,
}

impl From<&NodeCounters> for NodeCsvRow {
    fn from(n: &NodeCounters) -> Self {
        Self {
            addr: n.addr.clone(),
            entries_served: n.entries_served,
            loads: n.loads,
            remote_fetches_issued: n.remote_fetches_issued,
        }
    }
}
