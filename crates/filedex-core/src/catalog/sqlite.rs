use std::path::Path;

use rusqlite::{Connection, Result};
use tracing::debug;

/// Handle on the catalog database. Each job thread opens its own `Catalog`
/// against the same file; WAL mode serializes the writers and lets readers
/// proceed concurrently.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let catalog = Catalog { conn };
        catalog.configure_pragmas()?;
        catalog.migrate_schema()?;
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Catalog { conn };
        catalog.configure_pragmas()?;
        catalog.migrate_schema()?;
        Ok(catalog)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -32000;
             PRAGMA temp_store = MEMORY;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 32MB cache)");
        Ok(())
    }

    /// Check schema version and migrate if needed.
    /// Version < 1: drop all tables and recreate (the catalog is rebuilt by
    /// the next index pass, so nothing irreplaceable is lost).
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < 1 {
            debug!(
                "Schema version {} < 1, dropping all tables and recreating",
                version
            );
            self.conn.execute_batch(
                "DROP TABLE IF EXISTS op_history;
                 DROP TABLE IF EXISTS files_index;",
            )?;
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version 1)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM op_history;
             DELETE FROM files_index;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}
