//! Unified writer interface for feature tables
//!
//! Routes writes to either the JSONL or SQLite backend based on configuration.

use super::jsonl_writer::JsonlFeatureWriter;
use super::sqlite_writer::SqliteFeatureWriter;
use super::writer_backend::{FeatureWriterBackend, FeatureWriterError};
use crate::features::{CommunityAssignment, NodeEmbedding, NodeMetrics};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Database file used when the SQLite backend is pointed at a directory
pub const DEFAULT_DB_FILE: &str = "features.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    #[default]
    Jsonl,
    Sqlite,
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jsonl" => Ok(BackendType::Jsonl),
            "sqlite" => Ok(BackendType::Sqlite),
            _ => Err(format!("unknown backend '{}', expected jsonl or sqlite", s)),
        }
    }
}

impl BackendType {
    /// `--backend jsonl|sqlite`, defaulting to JSONL
    pub fn parse_from_args(args: &[String]) -> BackendType {
        args.iter()
            .position(|a| a == "--backend")
            .and_then(|idx| args.get(idx + 1))
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

fn sqlite_path(output: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(DEFAULT_DB_FILE)
    } else {
        output.to_path_buf()
    }
}

/// Unified writer that routes to either JSONL or SQLite backend
pub enum FeatureWriter {
    Jsonl(JsonlFeatureWriter),
    Sqlite(SqliteFeatureWriter),
}

impl FeatureWriter {
    /// `output` is a directory for JSONL. For SQLite it is a database file, or
    /// a directory that will hold `features.db`.
    pub fn new(backend: BackendType, output: impl AsRef<Path>) -> Result<Self, FeatureWriterError> {
        let output = output.as_ref();
        match backend {
            BackendType::Jsonl => {
                let writer = JsonlFeatureWriter::new(output)?;
                Ok(FeatureWriter::Jsonl(writer))
            }
            BackendType::Sqlite => {
                let writer = SqliteFeatureWriter::new(sqlite_path(output))?;
                Ok(FeatureWriter::Sqlite(writer))
            }
        }
    }

    fn backend(&mut self) -> &mut dyn FeatureWriterBackend {
        match self {
            FeatureWriter::Jsonl(w) => w,
            FeatureWriter::Sqlite(w) => w,
        }
    }

    pub async fn write_communities(&mut self, rows: &[CommunityAssignment]) -> Result<(), FeatureWriterError> {
        self.backend().write_communities(rows).await
    }

    pub async fn write_metrics(&mut self, rows: &[NodeMetrics]) -> Result<(), FeatureWriterError> {
        self.backend().write_metrics(rows).await
    }

    pub async fn write_embeddings(&mut self, rows: &[NodeEmbedding]) -> Result<(), FeatureWriterError> {
        self.backend().write_embeddings(rows).await
    }

    /// Flush pending writes to storage
    pub async fn flush(&mut self) -> Result<(), FeatureWriterError> {
        self.backend().flush().await
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            FeatureWriter::Jsonl(_) => "JSONL",
            FeatureWriter::Sqlite(_) => "SQLite",
        }
    }
}
