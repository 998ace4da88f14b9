
use std::{
    path::Path,
    sync::Mutex,
};

use rusqlite::{params, Connection, OptionalExtension};

/// Key-value storage contract. Values are serialized JSON blobs; keys are
/// `user:<token>` and `map:<token>`. Operations are linearisable per key.
pub trait Storage: Send + Sync {
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    /// A missing key is `Ok(None)`, not an error; callers recover locally.
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    /// Returns true if the key existed.
    fn delete(&self, key: &str) -> Result<bool, String>;
    fn flush(&self) -> Result<(), String>;
}

/// SQLite-backed store: one `kv` table behind a mutex-guarded connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("failed to create data dir {}: {e}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| format!("failed to open SQLite at {}: {e}", path.display()))?;
        Self::init(conn)
    }

    /// Private in-memory database, used by handler tests.
    pub fn open_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("failed to open in-memory SQLite: {e}"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, String> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;
             PRAGMA synchronous=NORMAL;",
        )
        .map_err(|e| format!("failed to set pragmas: {e}"))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at INTEGER NOT NULL
             );",
        )
        .map_err(|e| format!("failed to create schema: {e}"))?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

fn now_unix_s() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Storage for SqliteStore {
    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now_unix_s()],
        )
        .map_err(|e| format!("set {key} failed: {e}"))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| format!("get {key} failed: {e}"))
    }

    fn delete(&self, key: &str) -> Result<bool, String> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| format!("delete {key} failed: {e}"))?;
        Ok(deleted > 0)
    }

    fn flush(&self) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(|e| format!("flush failed: {e}"))
    }
}
