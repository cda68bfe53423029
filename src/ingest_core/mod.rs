//! Ingest Core - event table loading
//!
//! Loads the three event tables (transactions, DEX swaps, token transfers)
//! from either JSONL exports or a SQLite event database.

pub mod jsonl_reader;
pub mod records;
pub mod sqlite_reader;

pub use jsonl_reader::JsonlEventReader;
pub use records::{DexSwap, EventRecord, EventTables, TokenTransfer, Transaction};
pub use sqlite_reader::SqliteEventReader;

#[derive(Debug)]
pub enum ReaderError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Database(rusqlite::Error),
}

impl From<std::io::Error> for ReaderError {
    fn from(err: std::io::Error) -> Self {
        ReaderError::Io(err)
    }
}

impl From<serde_json::Error> for ReaderError {
    fn from(err: serde_json::Error) -> Self {
        ReaderError::Json(err)
    }
}

impl From<rusqlite::Error> for ReaderError {
    fn from(err: rusqlite::Error) -> Self {
        ReaderError::Database(err)
    }
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::Io(e) => write!(f, "IO error: {}", e),
            ReaderError::Json(e) => write!(f, "JSON error: {}", e),
            ReaderError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ReaderError {}
