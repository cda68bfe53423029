//! Asynchronous JSONL reader for exported event tables

use super::records::{DexSwap, EventRecord, EventTables, TokenTransfer, Transaction};
use super::ReaderError;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct JsonlEventReader {
    path: PathBuf,
    lines_read: usize,
    skipped: usize,
}

impl JsonlEventReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines_read: 0,
            skipped: 0,
        }
    }

    /// Read every row of the file. Malformed lines are logged and skipped.
    pub async fn read_all<T: EventRecord>(&mut self) -> Result<Vec<T>, ReaderError> {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut rows = Vec::new();

        log::info!("📖 Reading {} from {}", T::SOURCE, self.path.display());

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.lines_read += 1;

            match T::from_jsonl(line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    self.skipped += 1;
                    log::warn!(
                        "Failed to parse {} row at line {}: {}",
                        T::SOURCE,
                        self.lines_read,
                        e
                    );
                }
            }
        }

        log::debug!(
            "📥 {}: {} rows ({} skipped)",
            T::SOURCE,
            rows.len(),
            self.skipped
        );
        Ok(rows)
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Load the three event tables from their JSONL exports concurrently
pub async fn load_tables(
    transactions: &Path,
    dex_swaps: &Path,
    token_transfers: &Path,
) -> Result<EventTables, ReaderError> {
    let mut tx_reader = JsonlEventReader::new(transactions);
    let mut swap_reader = JsonlEventReader::new(dex_swaps);
    let mut transfer_reader = JsonlEventReader::new(token_transfers);

    let (transactions, dex_swaps, token_transfers) = tokio::try_join!(
        tx_reader.read_all::<Transaction>(),
        swap_reader.read_all::<DexSwap>(),
        transfer_reader.read_all::<TokenTransfer>(),
    )?;

    Ok(EventTables {
        transactions,
        dex_swaps,
        token_transfers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write_file(path: &Path, contents: &str) {
        let mut file = tokio::fs::File::create(path).await.unwrap();
        file.write_all(contents.as_bytes()).await.unwrap();
        file.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_all_skips_malformed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("transactions.jsonl");
        write_file(
            &path,
            "{\"FROM_ADDRESS\":\"a\",\"TO_ADDRESS\":\"b\"}\n\
             \n\
             {\"FROM_ADDRESS\": broken\n\
             {\"FROM_ADDRESS\":\"b\",\"TO_ADDRESS\":null}\n",
        )
        .await;

        let mut reader = JsonlEventReader::new(&path);
        let rows: Vec<Transaction> = reader.read_all().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(reader.lines_read(), 3);
        assert_eq!(reader.skipped(), 1);
        assert!(rows[1].to_address.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut reader = JsonlEventReader::new(temp_dir.path().join("nope.jsonl"));
        let result = reader.read_all::<DexSwap>().await;
        assert!(matches!(result, Err(ReaderError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_tables() {
        let temp_dir = tempfile::tempdir().unwrap();
        let tx = temp_dir.path().join("tx.jsonl");
        let swaps = temp_dir.path().join("swaps.jsonl");
        let transfers = temp_dir.path().join("transfers.jsonl");

        write_file(&tx, "{\"FROM_ADDRESS\":\"a\",\"TO_ADDRESS\":\"b\"}\n").await;
        write_file(&swaps, "{\"ORIGIN_FROM_ADDRESS\":\"a\",\"TX_TO\":\"router\"}\n").await;
        write_file(&transfers, "").await;

        let tables = load_tables(&tx, &swaps, &transfers).await.unwrap();
        assert_eq!(tables.transactions.len(), 1);
        assert_eq!(tables.dex_swaps.len(), 1);
        assert!(tables.token_transfers.is_empty());
        assert_eq!(tables.total_rows(), 2);
    }
}
