//! SQLite writer for feature tables
//!
//! Each table is keyed by `address` and rows are UPSERTed, so rerunning a pass
//! refreshes existing addresses in place. Every table write appends one row
//! to `feature_runs`.

use super::writer_backend::{FeatureTable, FeatureWriterBackend, FeatureWriterError};
use crate::features::{CommunityAssignment, NodeEmbedding, NodeMetrics};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

const DEFAULT_BATCH_SIZE: usize = 1000;

pub struct SqliteFeatureWriter {
    conn: Connection,
    batch_size: usize,
}

impl SqliteFeatureWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, FeatureWriterError> {
        Self::with_batch_size(db_path, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(db_path: impl AsRef<Path>, batch_size: usize) -> Result<Self, FeatureWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FeatureWriterError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to create database directory {}: {}", parent.display(), e),
                ))
            })?;
        }

        let conn = Connection::open(db_path.as_ref())?;
        apply_optimized_pragmas(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS address_communities (
                address TEXT PRIMARY KEY,
                community INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS network_metrics (
                address TEXT PRIMARY KEY,
                degree INTEGER NOT NULL,
                degree_centrality REAL NOT NULL,
                pagerank REAL NOT NULL,
                eigenvector_centrality REAL NOT NULL,
                clustering_coefficient REAL NOT NULL,
                core_number INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS node2vec_embeddings (
                address TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL,
                vector TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS feature_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feature TEXT NOT NULL,
                rows INTEGER NOT NULL,
                computed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_community ON address_communities(community);",
        )?;

        log::info!("✅ SQLite feature store initialized at {}", db_path.as_ref().display());

        Ok(Self {
            conn,
            batch_size: batch_size.max(1),
        })
    }

    /// Write `rows` in transactions of `batch_size`, then record the run
    fn write_batched<T>(
        &mut self,
        table: FeatureTable,
        rows: &[T],
        insert: impl Fn(&Transaction<'_>, &T) -> Result<(), FeatureWriterError>,
    ) -> Result<(), FeatureWriterError> {
        for chunk in rows.chunks(self.batch_size) {
            let tx = self.conn.transaction()?;
            for row in chunk {
                insert(&tx, row)?;
            }
            tx.commit()?;
            log::debug!("✅ Flushed {} rows to {}", chunk.len(), table.table_name());
        }

        self.conn.execute(
            "INSERT INTO feature_runs (feature, rows, computed_at) VALUES (?1, ?2, ?3)",
            params![table.feature(), rows.len() as i64, chrono::Utc::now().to_rfc3339()],
        )?;

        log::info!("✅ Upserted {} rows into {}", rows.len(), table.table_name());
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl FeatureWriterBackend for SqliteFeatureWriter {
    async fn write_communities(&mut self, rows: &[CommunityAssignment]) -> Result<(), FeatureWriterError> {
        self.write_batched(FeatureTable::Communities, rows, |tx, row| {
            tx.execute(
                "INSERT INTO address_communities (address, community) VALUES (?1, ?2)
                 ON CONFLICT(address) DO UPDATE SET community = excluded.community",
                params![row.address, row.community],
            )?;
            Ok(())
        })
    }

    async fn write_metrics(&mut self, rows: &[NodeMetrics]) -> Result<(), FeatureWriterError> {
        self.write_batched(FeatureTable::Metrics, rows, |tx, row| {
            tx.execute(
                "INSERT INTO network_metrics
                 (address, degree, degree_centrality, pagerank, eigenvector_centrality,
                  clustering_coefficient, core_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(address) DO UPDATE SET
                    degree = excluded.degree,
                    degree_centrality = excluded.degree_centrality,
                    pagerank = excluded.pagerank,
                    eigenvector_centrality = excluded.eigenvector_centrality,
                    clustering_coefficient = excluded.clustering_coefficient,
                    core_number = excluded.core_number",
                params![
                    row.address,
                    row.degree,
                    row.degree_centrality,
                    row.pagerank,
                    row.eigenvector_centrality,
                    row.clustering_coefficient,
                    row.core_number,
                ],
            )?;
            Ok(())
        })
    }

    async fn write_embeddings(&mut self, rows: &[NodeEmbedding]) -> Result<(), FeatureWriterError> {
        self.write_batched(FeatureTable::Embeddings, rows, |tx, row| {
            let vector = serde_json::to_string(&row.vector)?;
            tx.execute(
                "INSERT INTO node2vec_embeddings (address, dimensions, vector) VALUES (?1, ?2, ?3)
                 ON CONFLICT(address) DO UPDATE SET
                    dimensions = excluded.dimensions,
                    vector = excluded.vector",
                params![row.address, row.vector.len() as i64, vector],
            )?;
            Ok(())
        })
    }

    async fn flush(&mut self) -> Result<(), FeatureWriterError> {
        // Batches commit as they are written
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
