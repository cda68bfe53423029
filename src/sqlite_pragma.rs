//! Shared SQLite connection tuning
//!
//! Every reader and writer opens its connection through here so they agree on
//! journal mode and cache sizing.

use rusqlite::Connection;

/// Apply WAL journaling plus memory-friendly settings to a fresh connection.
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "mmap_size", 268_435_456i64)?;
    // negative value = KiB
    conn.pragma_update(None, "cache_size", -64_000i64)?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000i64)?;
    Ok(())
}
