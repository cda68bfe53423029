//! Writer backend trait for feature tables
//!
//! Defines the interface for persisting per-address feature rows to
//! different backends.

use crate::features::{CommunityAssignment, NodeEmbedding, NodeMetrics};
use async_trait::async_trait;

#[derive(Debug)]
pub enum FeatureWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
}

impl From<std::io::Error> for FeatureWriterError {
    fn from(err: std::io::Error) -> Self {
        FeatureWriterError::Io(err)
    }
}

impl From<serde_json::Error> for FeatureWriterError {
    fn from(err: serde_json::Error) -> Self {
        FeatureWriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for FeatureWriterError {
    fn from(err: rusqlite::Error) -> Self {
        FeatureWriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for FeatureWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureWriterError::Io(e) => write!(f, "IO error: {}", e),
            FeatureWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            FeatureWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for FeatureWriterError {}

/// The three per-address output tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTable {
    Communities,
    Metrics,
    Embeddings,
}

impl FeatureTable {
    /// Run-record name, matching the pass that produced the table
    pub fn feature(&self) -> &'static str {
        match self {
            FeatureTable::Communities => "community",
            FeatureTable::Metrics => "metrics",
            FeatureTable::Embeddings => "embeddings",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            FeatureTable::Communities => "addresses_community.jsonl",
            FeatureTable::Metrics => "network_metrics.jsonl",
            FeatureTable::Embeddings => "node2vec_embeddings.jsonl",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            FeatureTable::Communities => "address_communities",
            FeatureTable::Metrics => "network_metrics",
            FeatureTable::Embeddings => "node2vec_embeddings",
        }
    }
}

/// Backend trait for writing feature tables
#[async_trait]
pub trait FeatureWriterBackend: Send {
    /// Write the `address, community` table
    async fn write_communities(&mut self, rows: &[CommunityAssignment]) -> Result<(), FeatureWriterError>;

    /// Write the centrality table
    async fn write_metrics(&mut self, rows: &[NodeMetrics]) -> Result<(), FeatureWriterError>;

    /// Write the `address, n2v_0..` table
    async fn write_embeddings(&mut self, rows: &[NodeEmbedding]) -> Result<(), FeatureWriterError>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> Result<(), FeatureWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
