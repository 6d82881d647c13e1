//! SQLite Key-Value Store
//!
//! Keeps every blob in one `kv` table.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::error::{PersistenceError, PersistenceResult};
use super::kv::KeyValueStore;

pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open a database file, creating the table if needed
    pub fn open(path: &Path) -> PersistenceResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> PersistenceResult<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> PersistenceResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PersistenceError::Lock(e.to_string()))?;
        Ok(f(&*conn)?)
    }
}

fn run_migrations(conn: &Connection) -> PersistenceResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
                .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        self.with_conn(|conn| conn.execute("DELETE FROM kv WHERE key = ?1", params![key]))?;
        Ok(())
    }
}
