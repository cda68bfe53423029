//! SQLite event reader with id cursor paging
//!
//! Reads the `transactions`, `dex_swaps` and `token_transfers` tables in pages
//! of `page_size` rows ordered by `id`, so very large tables never need a
//! single giant result set.

use super::records::{DexSwap, EventTables, TokenTransfer, Transaction};
use super::ReaderError;
use crate::sqlite_pragma::apply_optimized_pragmas;
use rusqlite::{Connection, Row};
use std::path::Path;

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Mapping between an event record and its table
pub trait SqliteEventRow: Sized {
    const TABLE: &'static str;
    /// Column list selected before the trailing `id`
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl SqliteEventRow for Transaction {
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static str = "from_address, to_address, network";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Transaction {
            from_address: row.get(0)?,
            to_address: row.get(1)?,
            network: row.get(2)?,
        })
    }
}

impl SqliteEventRow for DexSwap {
    const TABLE: &'static str = "dex_swaps";
    const COLUMNS: &'static str = "origin_from_address, origin_to_address, tx_to, sender, network";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DexSwap {
            origin_from_address: row.get(0)?,
            origin_to_address: row.get(1)?,
            tx_to: row.get(2)?,
            sender: row.get(3)?,
            network: row.get(4)?,
        })
    }
}

impl SqliteEventRow for TokenTransfer {
    const TABLE: &'static str = "token_transfers";
    const COLUMNS: &'static str =
        "from_address, to_address, origin_from_address, origin_to_address, network";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TokenTransfer {
            from_address: row.get(0)?,
            to_address: row.get(1)?,
            origin_from_address: row.get(2)?,
            origin_to_address: row.get(3)?,
            network: row.get(4)?,
        })
    }
}

pub struct SqliteEventReader {
    conn: Connection,
    page_size: usize,
}

impl SqliteEventReader {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let conn = Connection::open(db_path.as_ref())?;
        apply_optimized_pragmas(&conn)?;

        // Must be after PRAGMAs
        conn.execute_batch("PRAGMA query_only = ON")?;

        log::info!("📥 SQLite event reader opened: {}", db_path.as_ref().display());

        Ok(Self {
            conn,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(db_path: impl AsRef<Path>, page_size: usize) -> Result<Self, ReaderError> {
        let mut reader = Self::new(db_path)?;
        reader.page_size = page_size.max(1);
        Ok(reader)
    }

    /// Read one page of rows with `id > after_id`.
    /// Returns the rows and the highest id seen (or `after_id` when empty).
    pub fn read_page<T: SqliteEventRow>(&self, after_id: i64) -> Result<(Vec<T>, i64), ReaderError> {
        let sql = format!(
            "SELECT {}, id FROM {} WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
            T::COLUMNS,
            T::TABLE
        );
        let id_column = T::COLUMNS.split(',').count();

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let row_iter = stmt.query_map(
            rusqlite::params![after_id, self.page_size as i64],
            |row| Ok((T::from_row(row)?, row.get::<_, i64>(id_column)?)),
        )?;

        let mut rows = Vec::new();
        let mut max_id = after_id;
        for result in row_iter {
            let (record, id) = result?;
            rows.push(record);
            max_id = max_id.max(id);
        }

        Ok((rows, max_id))
    }

    /// Read a whole table by walking the id cursor
    pub fn read_table<T: SqliteEventRow>(&self) -> Result<Vec<T>, ReaderError> {
        let mut cursor = 0i64;
        let mut all = Vec::new();

        loop {
            let (page, next) = self.read_page::<T>(cursor)?;
            if page.is_empty() {
                break;
            }
            log::debug!("📥 {}: page of {} rows, cursor id={}", T::TABLE, page.len(), next);
            all.extend(page);
            cursor = next;
        }

        log::info!("📥 Read {} rows from {}", all.len(), T::TABLE);
        Ok(all)
    }

    pub fn load_tables(&self) -> Result<EventTables, ReaderError> {
        Ok(EventTables {
            transactions: self.read_table::<Transaction>()?,
            dex_swaps: self.read_table::<DexSwap>()?,
            token_transfers: self.read_table::<TokenTransfer>()?,
        })
    }
}
