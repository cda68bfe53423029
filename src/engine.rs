//! Feature Engine - orchestration of a feature run
//!
//! ```text
//! load tables (JSONL | SQLite)
//!     ↓
//! EventAggregator → Vec<WeightedEdge>
//!     ↓
//! AddressGraph::from_edges → prune(min_edge_weight)
//!     ↓                       (shared as Arc<AddressGraph>)
//! community | metrics | embeddings   (spawn_blocking, concurrent)
//!     ↓
//! FeatureWriter
//! ```
//!
//! Passes share nothing but the read-only graph, so any subset can run.

use crate::config::{ConfigError, GraphConfig, InputSource};
use crate::features::{
    community_sizes, summarize_metrics, CentralitySuite, CommunityAssignment, CommunityDetector,
    FeatureComputer, FeatureError, Node2VecEmbedder, NodeEmbedding, NodeMetrics,
};
use crate::graph_core::{AddressGraph, AggregationStats, EventAggregator};
use crate::ingest_core::{jsonl_reader, EventTables, ReaderError, SqliteEventReader};
use crate::output_core::{FeatureWriter, FeatureWriterError};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

const TOP_COMMUNITIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeaturePass {
    Community,
    Metrics,
    Embeddings,
}

impl FeaturePass {
    pub fn all() -> Vec<FeaturePass> {
        vec![FeaturePass::Community, FeaturePass::Metrics, FeaturePass::Embeddings]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeaturePass::Community => "community",
            FeaturePass::Metrics => "metrics",
            FeaturePass::Embeddings => "embeddings",
        }
    }

    /// `--pass community|metrics|embeddings|all`, repeatable. No flag means all.
    pub fn parse_from_args(args: &[String]) -> Result<Vec<FeaturePass>, ConfigError> {
        let mut passes = Vec::new();

        for (idx, arg) in args.iter().enumerate() {
            if arg != "--pass" {
                continue;
            }
            let value = args
                .get(idx + 1)
                .ok_or_else(|| ConfigError::InvalidValue("--pass needs a value".to_string()))?;
            match value.to_lowercase().as_str() {
                "community" => passes.push(FeaturePass::Community),
                "metrics" => passes.push(FeaturePass::Metrics),
                "embeddings" => passes.push(FeaturePass::Embeddings),
                "all" => passes.extend(FeaturePass::all()),
                other => {
                    return Err(ConfigError::InvalidValue(format!(
                        "--pass must be community, metrics, embeddings or all, got '{}'",
                        other
                    )))
                }
            }
        }

        if passes.is_empty() {
            return Ok(FeaturePass::all());
        }
        passes.sort();
        passes.dedup();
        Ok(passes)
    }
}

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Reader(ReaderError),
    Feature(FeatureError),
    Writer(FeatureWriterError),
    /// A blocking pass panicked or was cancelled
    Task(String),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err)
    }
}

impl From<ReaderError> for EngineError {
    fn from(err: ReaderError) -> Self {
        EngineError::Reader(err)
    }
}

impl From<FeatureError> for EngineError {
    fn from(err: FeatureError) -> Self {
        EngineError::Feature(err)
    }
}

impl From<FeatureWriterError> for EngineError {
    fn from(err: FeatureWriterError) -> Self {
        EngineError::Writer(err)
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Task(err.to_string())
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "Config error: {}", e),
            EngineError::Reader(e) => write!(f, "Reader error: {}", e),
            EngineError::Feature(e) => write!(f, "Feature error: {}", e),
            EngineError::Writer(e) => write!(f, "Writer error: {}", e),
            EngineError::Task(e) => write!(f, "Task error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

/// Outcome of one run. Tables of passes that were not selected, or that had
/// nothing to compute on, are `None`.
#[derive(Debug, Default)]
pub struct RunReport {
    pub aggregation: AggregationStats,
    pub directed_pairs: usize,
    pub nodes: usize,
    pub edges: usize,
    pub pruned_edges: usize,
    pub communities: Option<Vec<CommunityAssignment>>,
    pub metrics: Option<Vec<NodeMetrics>>,
    pub embeddings: Option<Vec<NodeEmbedding>>,
}

fn spawn_pass<C>(computer: C, graph: Arc<AddressGraph>) -> JoinHandle<Result<C::Output, FeatureError>>
where
    C: FeatureComputer + 'static,
{
    tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        log::info!("▶️  Running {} pass", computer.name());
        let result = computer.compute(&graph);
        log::info!(
            "⏱️  {} pass finished in {:.2}s",
            computer.name(),
            started.elapsed().as_secs_f64()
        );
        result
    })
}

async fn join_pass<T>(handle: Option<JoinHandle<Result<T, FeatureError>>>) -> Result<Option<T>, EngineError> {
    match handle {
        Some(handle) => Ok(Some(handle.await??)),
        None => Ok(None),
    }
}

pub struct FeatureEngine {
    config: GraphConfig,
    passes: Vec<FeaturePass>,
}

impl FeatureEngine {
    pub fn new(config: GraphConfig, passes: Vec<FeaturePass>) -> Self {
        Self { config, passes }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn passes(&self) -> &[FeaturePass] {
        &self.passes
    }

    fn runs(&self, pass: FeaturePass) -> bool {
        self.passes.contains(&pass)
    }

    /// Load the configured event tables
    pub async fn load_tables(&self) -> Result<EventTables, EngineError> {
        let started = Instant::now();
        let tables = match self.config.input {
            InputSource::Jsonl => {
                jsonl_reader::load_tables(
                    &self.config.transactions_path,
                    &self.config.dex_swaps_path,
                    &self.config.token_transfers_path,
                )
                .await?
            }
            InputSource::Sqlite => {
                let db_path = self.config.events_db_path.clone();
                tokio::task::spawn_blocking(move || SqliteEventReader::new(&db_path)?.load_tables())
                    .await??
            }
        };

        log::info!(
            "📥 Loaded {} transactions, {} DEX swaps, {} token transfers in {:.2}s",
            tables.transactions.len(),
            tables.dex_swaps.len(),
            tables.token_transfers.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(tables)
    }

    /// Aggregate and prune. Returns the graph plus a report with the graph
    /// fields filled in.
    pub fn build_graph(&self, tables: &EventTables) -> (AddressGraph, RunReport) {
        let started = Instant::now();
        let mut aggregator = EventAggregator::new(&self.config.networks);
        aggregator.add_tables(tables);
        let aggregation = aggregator.stats().clone();
        let directed_pairs = aggregator.pair_count();
        let edges = aggregator.into_edges();

        log::info!(
            "🔗 Aggregated {} events into {} directed pairs ({} null endpoints, {} other networks dropped)",
            aggregation.accepted(),
            directed_pairs,
            aggregation.dropped_null,
            aggregation.dropped_network
        );

        let mut graph = AddressGraph::from_edges(&edges, self.config.edge_merge);
        log::info!(
            "🕸️  Graph before pruning: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        let pruned_edges = graph.prune(self.config.min_edge_weight);
        log::info!(
            "✂️  Pruned {} edges below weight {}: {} nodes, {} edges remain ({:.2}s)",
            pruned_edges,
            self.config.min_edge_weight,
            graph.node_count(),
            graph.edge_count(),
            started.elapsed().as_secs_f64()
        );

        let report = RunReport {
            aggregation,
            directed_pairs,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            pruned_edges,
            ..RunReport::default()
        };
        (graph, report)
    }

    /// Run the selected passes concurrently over a shared graph
    pub async fn compute(&self, graph: AddressGraph, report: &mut RunReport) -> Result<(), EngineError> {
        let graph = Arc::new(graph);

        let community = self.runs(FeaturePass::Community).then(|| {
            spawn_pass(CommunityDetector::new(self.config.community.clone()), graph.clone())
        });
        let metrics = self
            .runs(FeaturePass::Metrics)
            .then(|| spawn_pass(CentralitySuite::new(self.config.centrality.clone()), graph.clone()));
        let embeddings = self
            .runs(FeaturePass::Embeddings)
            .then(|| spawn_pass(Node2VecEmbedder::new(self.config.embedding.clone()), graph.clone()));

        report.communities = join_pass(community).await?;
        report.metrics = join_pass(metrics).await?;
        report.embeddings = match join_pass(embeddings).await {
            Err(EngineError::Feature(FeatureError::EmptyGraph)) => {
                log::warn!("⚠️  No connected addresses after pruning, skipping embeddings");
                None
            }
            other => other?,
        };

        Ok(())
    }

    /// Persist whichever tables the report holds
    pub async fn write(&self, report: &RunReport, writer: &mut FeatureWriter) -> Result<(), EngineError> {
        if let Some(rows) = &report.communities {
            writer.write_communities(rows).await?;
        }
        if let Some(rows) = &report.metrics {
            writer.write_metrics(rows).await?;
        }
        if let Some(rows) = &report.embeddings {
            writer.write_embeddings(rows).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    pub async fn run_on_tables(&self, tables: &EventTables, writer: &mut FeatureWriter) -> Result<RunReport, EngineError> {
        let (graph, mut report) = self.build_graph(tables);
        self.compute(graph, &mut report).await?;
        log_summary(&report);
        self.write(&report, writer).await?;
        Ok(report)
    }

    pub async fn run(&self, writer: &mut FeatureWriter) -> Result<RunReport, EngineError> {
        let tables = self.load_tables().await?;
        self.run_on_tables(&tables, writer).await
    }
}

fn log_summary(report: &RunReport) {
    if let Some(rows) = &report.communities {
        let sizes = community_sizes(rows, TOP_COMMUNITIES);
        log::info!("👥 Community sizes (top {}):", TOP_COMMUNITIES);
        for (community, size) in sizes {
            log::info!("   community {:>6}: {} addresses", community, size);
        }
    }

    if let Some(rows) = &report.metrics {
        log::info!("📊 Metric summary over {} addresses:", rows.len());
        for column in summarize_metrics(rows) {
            log::info!("   {}", column);
        }
    }

    if let Some(rows) = &report.embeddings {
        let dims = rows.first().map(|r| r.vector.len()).unwrap_or(0);
        log::info!("🧬 {} embeddings of {} dimensions", rows.len(), dims);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_passes() {
        assert_eq!(FeaturePass::parse_from_args(&args(&["bin"])).unwrap(), FeaturePass::all());
        assert_eq!(
            FeaturePass::parse_from_args(&args(&["bin", "--pass", "embeddings", "--pass", "community"])).unwrap(),
            vec![FeaturePass::Community, FeaturePass::Embeddings]
        );
        assert_eq!(
            FeaturePass::parse_from_args(&args(&["bin", "--pass", "metrics", "--pass", "all"])).unwrap(),
            FeaturePass::all()
        );
        assert!(FeaturePass::parse_from_args(&args(&["bin", "--pass", "labels"])).is_err());
        assert!(FeaturePass::parse_from_args(&args(&["bin", "--pass"])).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::from(FeatureError::EmptyGraph);
        assert!(err.to_string().starts_with("Feature error"));
    }
}
