//! SQLite key/value table storage
//!
//! Every table has the same shape: a unique text key and a JSON document
//! value. Higher layers decide what the documents mean.

use crate::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const NETWORKS_TABLE: &str = "networks";
pub const NODES_TABLE: &str = "nodes";

const TABLES: [&str; 2] = [NETWORKS_TABLE, NODES_TABLE];

/// Database wrapper for state persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;

        info!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        for table in TABLES {
            self.create_table(table)?;
        }
        debug!("Database schema initialized");
        Ok(())
    }

    fn create_table(&self, table: &str) -> Result<()> {
        check_table(table)?;
        let conn = self.conn.lock();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT NOT NULL UNIQUE PRIMARY KEY, value TEXT NOT NULL)",
            table
        ))?;
        Ok(())
    }

    /// Insert or replace the document stored under `key`
    pub fn insert<T: Serialize>(&self, table: &str, key: &str, value: &T) -> Result<()> {
        check_table(table)?;
        let json = serde_json::to_string(value)?;
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)", table),
            params![key, json],
        )?;
        debug!("Stored {} record {}", table, key);
        Ok(())
    }

    /// Fetch the document stored under `key`
    pub fn fetch_record<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        check_table(table)?;
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", table),
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Fetch every document in a table, ordered by key
    pub fn fetch_records<T: DeserializeOwned>(&self, table: &str) -> Result<BTreeMap<String, T>> {
        check_table(table)?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT key, value FROM {} ORDER BY key", table))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = BTreeMap::new();
        for row in rows {
            let (key, json) = row?;
            records.insert(key, serde_json::from_str(&json)?);
        }
        Ok(records)
    }

    /// Delete one record, returning how many rows were removed
    pub fn delete_record(&self, table: &str, key: &str) -> Result<usize> {
        check_table(table)?;
        let conn = self.conn.lock();
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE key = ?1", table),
            params![key],
        )?;
        if rows > 0 {
            debug!("Deleted {} record {}", table, key);
        }
        Ok(rows)
    }

    /// Count records whose JSON document has `field == value`
    pub fn count_where(&self, table: &str, field: &str, value: &str) -> Result<u64> {
        check_table(table)?;
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE json_extract(value, ?1) = ?2",
                table
            ),
            params![format!("$.{}", field), value],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Flush the WAL and release the connection's resources
    pub fn close(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        info!("Database closed");
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only known tables are accepted
fn check_table(table: &str) -> Result<()> {
    if TABLES.contains(&table) {
        Ok(())
    } else {
        Err(Error::Internal(format!("unknown table {}", table)))
    }
}
