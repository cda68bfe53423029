//! JSONL writer for feature tables - one file per table in the output directory
//!
//! Files are truncated when a table is first written in a run, so a rerun
//! replaces the previous feature set instead of appending to it.

use super::writer_backend::{FeatureTable, FeatureWriterBackend, FeatureWriterError};
use crate::features::{CommunityAssignment, NodeEmbedding, NodeMetrics};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonlFeatureWriter {
    dir: PathBuf,
    writers: HashMap<FeatureTable, BufWriter<File>>,
}

impl JsonlFeatureWriter {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        log::info!("📝 Writing feature tables to: {}", dir.display());

        Ok(Self {
            dir,
            writers: HashMap::new(),
        })
    }

    pub fn path_for(&self, table: FeatureTable) -> PathBuf {
        self.dir.join(table.file_name())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&mut self, table: FeatureTable) -> std::io::Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(&table) {
            let path = self.path_for(table);
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?;
            log::debug!("Opened {}", path.display());
            self.writers.insert(table, BufWriter::new(file));
        }
        self.writers
            .get_mut(&table)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "Writer not found"))
    }

    pub fn write_rows<T: Serialize>(&mut self, table: FeatureTable, rows: &[T]) -> Result<(), FeatureWriterError> {
        let writer = self.writer(table)?;
        for row in rows {
            let json = serde_json::to_string(row)?;
            writeln!(writer, "{}", json)?;
        }
        log::info!("✅ Wrote {} rows to {}", rows.len(), table.file_name());
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for JsonlFeatureWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[async_trait]
impl FeatureWriterBackend for JsonlFeatureWriter {
    async fn write_communities(&mut self, rows: &[CommunityAssignment]) -> Result<(), FeatureWriterError> {
        self.write_rows(FeatureTable::Communities, rows)
    }

    async fn write_metrics(&mut self, rows: &[NodeMetrics]) -> Result<(), FeatureWriterError> {
        self.write_rows(FeatureTable::Metrics, rows)
    }

    async fn write_embeddings(&mut self, rows: &[NodeEmbedding]) -> Result<(), FeatureWriterError> {
        self.write_rows(FeatureTable::Embeddings, rows)
    }

    async fn flush(&mut self) -> Result<(), FeatureWriterError> {
        JsonlFeatureWriter::flush(self)?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
