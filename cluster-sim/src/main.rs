//! CLI entry point: stand up an in-process `ringcache` cluster, drive
//! synthetic read traffic through it, and print (or export) the resulting
//! hit-rate and routing statistics.

use std::path::PathBuf;

use clap::Parser;
use cluster_sim::models::{NodeCsvRow, SimulationConfig};
use cluster_sim::runner;

/// Drive synthetic traffic through an in-process ringcache cluster.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of in-process peer nodes to stand up.
    #[arg(short, long, default_value = "4")]
    nodes: usize,

    /// Total number of `get` requests to drive through the cluster.
    #[arg(short, long, default_value = "20000")]
    requests: usize,

    /// Size of the key space requests are drawn from.
    #[arg(short = 'k', long, default_value = "2000")]
    unique_keys: usize,

    /// Fraction of the key space treated as "popular".
    #[arg(long, default_value = "0.2")]
    popular_keys_fraction: f64,

    /// Fraction of requests that land on a popular key.
    #[arg(long, default_value = "0.8")]
    popular_traffic_fraction: f64,

    /// Virtual replicas per node on the consistent-hash ring.
    #[arg(long, default_value = "100")]
    replicas: usize,

    /// Write a per-node CSV breakdown to this path.
    #[arg(long, value_name = "PATH")]
    output_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = SimulationConfig {
        nodes: args.nodes,
        requests: args.requests,
        unique_keys: args.unique_keys,
        popular_keys_fraction: args.popular_keys_fraction,
        popular_traffic_fraction: args.popular_traffic_fraction,
        replicas: args.replicas,
        output_csv: args.output_csv.clone(),
    };

    let result = runner::run(config).await?;

    println!("Cluster Simulation");
    println!("==================");
    println!("Nodes:            {}", result.per_node.len());
    println!("Total requests:   {}", result.total_requests);
    println!("Duration:         {:.2?}", result.duration);
    println!("Hit rate:         {:.2}%", result.hit_rate() * 100.0);
    println!(
        "  local hits:     {} ({:.1}%)",
        result.local_hits,
        pct(result.local_hits, result.total_requests)
    );
    println!(
        "  local loads:    {} ({:.1}%)",
        result.local_loads,
        pct(result.local_loads, result.total_requests)
    );
    println!(
        "  remote fetches: {} ({:.1}%)",
        result.remote_fetches,
        pct(result.remote_fetches, result.total_requests)
    );
    println!(
        "Redistribution if a node joined: {:.1}% of sampled keys",
        result.redistribution_on_growth * 100.0
    );

    println!("\nPer-node breakdown:");
    println!("{:<24} {:>12} {:>10} {:>10}", "address", "entries", "loads", "remote");
    for node in &result.per_node {
        println!(
            "{:<24} {:>12} {:>10} {:>10}",
            node.addr, node.entries_served, node.loads, node.remote_fetches_issued
        );
    }

    if let Some(path) = &args.output_csv {
        let mut writer = csv::Writer::from_path(path)?;
        for node in &result.per_node {
            writer.serialize(NodeCsvRow::from(node))?;
        }
        writer.flush()?;
        println!("\nPer-node CSV written to: {}", path.display());
    }

    Ok(())
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}
