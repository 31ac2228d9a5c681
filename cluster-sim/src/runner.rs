//! Wires a handful of in-process nodes together over the loopback HTTP
//! transport, drives synthetic traffic through them, and collects the
//! resulting hit-rate and routing statistics.

use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use ringcache::error::{BackingStoreError, TransportError};
use ringcache::hashring::ConsistentHash;
use ringcache::node::Node;
use ringcache::registry::{LocalRegistry, Registry};
use ringcache::store::BackingStore;
use ringcache::transport::{HttpTransport, ResourceLookup, Transport};

use crate::generator::{value_for_key, KeyPopularityGenerator};
use crate::models::{NodeCounters, RequestOutcome, SimulationConfig, SimulationResult};

const GROUP_NAME: &str = "cluster-sim";
const MAX_BYTES_PER_NODE: usize = 64 * 1024 * 1024;
const CACHE_TIMEOUT: Duration = Duration::from_secs(300);
const MIN_VALUE_SIZE: usize = 64;
const MAX_VALUE_SIZE: usize = 4096;

/// A [`BackingStore`] that always answers (this simulation has no genuinely
/// missing keys) and counts how many times it was asked, so the runner can
/// tell a local cache hit from a local load.
struct CountingStore {
    loads: Arc<AtomicUsize>,
}

#[async_trait]
impl BackingStore for CountingStore {
    async fn load(&self, key: &str) -> Result<Option<Bytes>, BackingStoreError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(Some(value_for_key(key, MIN_VALUE_SIZE, MAX_VALUE_SIZE)))
    }
}

/// Wraps [`HttpTransport`] to count outbound fetches per node, the other half
/// of the hit/load/remote classification the runner reports on.
struct CountingTransport {
    inner: HttpTransport,
    remote_fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for CountingTransport {
    async fn get_from_remote(&self, addr: &str, group: &str, key: &str) -> Result<Bytes, TransportError> {
        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
        self.inner.get_from_remote(addr, group, key).await
    }

    async fn serve(&self, addr: &str, resource: Arc<dyn ResourceLookup>) -> Result<(), TransportError> {
        self.inner.serve(addr, resource).await
    }
}

fn free_loopback_addr() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind an ephemeral port");
    listener.local_addr().expect("ephemeral port has a local addr").to_string()
}

/// Drives one complete simulation run end to end.
pub async fn run(config: SimulationConfig) -> Result<SimulationResult, Box<dyn std::error::Error>> {
    let registry: Arc<dyn Registry> = Arc::new(LocalRegistry::new());
    let addrs: Vec<String> = (0..config.nodes).map(|_| free_loopback_addr()).collect();

    let mut loads_by_addr = HashMap::new();
    let mut remotes_by_addr = HashMap::new();
    let mut running = Vec::new();

    for addr in &addrs {
        let loads = Arc::new(AtomicUsize::new(0));
        let remote_fetches = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(CountingStore { loads: Arc::clone(&loads) });
        let transport = Arc::new(CountingTransport {
            inner: HttpTransport::new(),
            remote_fetches: Arc::clone(&remote_fetches),
        });

        let node = Node::new()
            .replicas(config.replicas)
            .group(GROUP_NAME, "lru", "consistenthash", MAX_BYTES_PER_NODE, CACHE_TIMEOUT, store)
            .registry(Arc::clone(&registry))
            .transport(transport)
            .spawn(addr)
            .await?;

        loads_by_addr.insert(addr.clone(), loads);
        remotes_by_addr.insert(addr.clone(), remote_fetches);
        running.push(node);
    }

    // Let every node's registry membership settle and its listener come up
    // before traffic starts.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let generator = KeyPopularityGenerator::new(
        config.unique_keys,
        config.popular_keys_fraction,
        config.popular_traffic_fraction,
    );

    let mut rng = rand::thread_rng();
    let mut entries_served = vec![0usize; addrs.len()];
    let mut local_hits = 0usize;
    let mut local_loads = 0usize;
    let mut remote_fetches = 0usize;

    let started = Instant::now();
    for _ in 0..config.requests {
        let entry = rng.gen_range(0..running.len());
        let key = generator.next_key(&mut rng);
        let group = running[entry].group(GROUP_NAME).expect("group was just registered");

        let loads_counter = &loads_by_addr[&addrs[entry]];
        let remote_counter = &remotes_by_addr[&addrs[entry]];
        let loads_before = loads_counter.load(Ordering::Relaxed);
        let remote_before = remote_counter.load(Ordering::Relaxed);

        group.get(&key).await?;

        let outcome = if remote_counter.load(Ordering::Relaxed) > remote_before {
            RequestOutcome::RemoteFetch
        } else if loads_counter.load(Ordering::Relaxed) > loads_before {
            RequestOutcome::LocalLoad
        } else {
            RequestOutcome::LocalHit
        };

        entries_served[entry] += 1;
        match outcome {
            RequestOutcome::LocalHit => local_hits += 1,
            RequestOutcome::LocalLoad => local_loads += 1,
            RequestOutcome::RemoteFetch => remote_fetches += 1,
        }
    }
    let duration = started.elapsed();

    let per_node = addrs
        .iter()
        .enumerate()
        .map(|(i, addr)| NodeCounters {
            addr: addr.clone(),
            entries_served: entries_served[i],
            loads: loads_by_addr[addr].load(Ordering::Relaxed),
            remote_fetches_issued: remotes_by_addr[addr].load(Ordering::Relaxed),
        })
        .collect();

    let redistribution_on_growth = estimate_redistribution(&addrs, config.replicas, config.unique_keys);

    Ok(SimulationResult {
        total_requests: config.requests,
        local_hits,
        local_loads,
        remote_fetches,
        duration,
        per_node,
        redistribution_on_growth,
    })
}

/// Samples the configured key space and reports what fraction would change
/// owner if one additional node joined the ring, all else held fixed.
fn estimate_redistribution(addrs: &[String], replicas: usize, unique_keys: usize) -> f64 {
    if addrs.is_empty() {
        return 0.0;
    }
    let ring = ConsistentHash::new(replicas);
    let mut grown = addrs.to_vec();
    grown.push("hypothetical-new-node".to_string());

    let sample_size = unique_keys.clamp(1, 10_000);
    let moved = (0..sample_size)
        .filter(|i| {
            let key = format!("key-{i}");
            ring.pick(addrs, &key) != ring.pick(&grown, &key)
        })
        .count();
    moved as f64 / sample_size as f64
}
