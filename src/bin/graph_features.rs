//! Graph Features Binary - address graph feature computation
//!
//! Builds the pruned address-interaction graph from event exports and writes
//! Louvain communities, centrality metrics and Node2Vec embeddings.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin graph_features
//! cargo run --release --bin graph_features -- --backend sqlite --pass community --pass metrics
//! ```
//!
//! ## Environment Variables
//!
//! - WALLETGRAPH_INPUT - Event source, jsonl or sqlite (default: jsonl)
//! - TRANSACTIONS_PATH, DEX_SWAPS_PATH, TOKEN_TRANSFERS_PATH - JSONL inputs
//! - EVENTS_DB_PATH - SQLite event database (default: data/raw/events.db)
//! - FEATURES_OUTPUT_PATH - Output directory or database file (default: data/processed)
//! - NETWORKS - Comma-separated network filter (default: all)
//! - MIN_EDGE_WEIGHT - Minimum interactions per edge (default: 3)
//! - RUST_LOG - Logging level (optional, default: info)
//!
//! See `GraphConfig::from_env` for the algorithm parameters.

use std::env;
use walletgraph::output_core::{BackendType, FeatureWriter};
use walletgraph::{FeatureEngine, FeaturePass, GraphConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let backend = BackendType::parse_from_args(&args);
    let passes = FeaturePass::parse_from_args(&args)?;
    let config = GraphConfig::from_env()?;

    log::info!("🚀 Starting graph feature run");
    log::info!("   Input: {:?}", config.input);
    log::info!("   Output: {}", config.output_path.display());
    log::info!(
        "   Passes: {}",
        passes.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
    );
    log::info!("   Min edge weight: {}", config.min_edge_weight);
    if !config.networks.is_empty() {
        log::info!("   Networks: {}", config.networks.join(", "));
    }

    let mut writer = FeatureWriter::new(backend, &config.output_path)?;
    log::info!("📊 Backend: {}", writer.backend_type());

    let engine = FeatureEngine::new(config, passes);
    let report = engine.run(&mut writer).await?;

    log::info!(
        "✅ Done: {} nodes, {} edges ({} community rows, {} metric rows, {} embeddings)",
        report.nodes,
        report.edges,
        report.communities.as_ref().map_or(0, |rows| rows.len()),
        report.metrics.as_ref().map_or(0, |rows| rows.len()),
        report.embeddings.as_ref().map_or(0, |rows| rows.len()),
    );

    Ok(())
}
