//! Feature passes over the pruned address graph
//!
//! Each pass implements [`FeatureComputer`] and runs against a shared,
//! read-only `AddressGraph`:
//!
//! - `community` - Louvain community ids
//! - `metrics` - centrality suite
//! - `embeddings` - Node2Vec vectors

pub mod centrality;
pub mod community;
pub mod embedding;
pub mod node2vec;
pub mod summary;
pub mod word2vec;

pub use centrality::{CentralitySuite, NodeMetrics};
pub use community::{CommunityAssignment, CommunityDetector};
pub use embedding::{Node2VecEmbedder, NodeEmbedding};
pub use summary::{community_sizes, summarize_metrics, ColumnSummary};

use crate::graph_core::AddressGraph;

#[derive(Debug)]
pub enum FeatureError {
    /// Nothing left to compute on (e.g. every node isolated)
    EmptyGraph,
    NotConverged {
        metric: &'static str,
        iterations: usize,
    },
    InvalidParameter(String),
    ThreadPool(String),
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::EmptyGraph => write!(f, "Graph has no nodes to compute features on"),
            FeatureError::NotConverged { metric, iterations } => {
                write!(f, "{} did not converge within {} iterations", metric, iterations)
            }
            FeatureError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            FeatureError::ThreadPool(msg) => write!(f, "Failed to build worker pool: {}", msg),
        }
    }
}

impl std::error::Error for FeatureError {}

/// A feature pass producing one row per address
pub trait FeatureComputer: Send + Sync {
    type Output: Send + 'static;

    /// Short pass name used in logs and run records
    fn name(&self) -> &'static str;

    fn compute(&self, graph: &AddressGraph) -> Result<Self::Output, FeatureError>;
}
