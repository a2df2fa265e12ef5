//! Key-value configuration storage backed by SQLite.
//!
//! Shares a database with [`SqliteStore`](crate::store::sqlite::SqliteStore)
//! — pass the same path to both.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::Mutex;

const PAGE_SIZE_KEY: &str = "page_size";
const DATASET_KEY: &str = "dataset";

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    // --- Typed accessors ---

    /// Preferred rows per page, if one was saved. Unparseable values
    /// count as unset.
    pub fn page_size(&self) -> Result<Option<u32>> {
        Ok(self.get(PAGE_SIZE_KEY)?.and_then(|s| s.parse().ok()))
    }

    pub fn set_page_size(&self, size: u32) -> Result<()> {
        self.set(PAGE_SIZE_KEY, &size.to_string())
    }

    /// The dataset the shell last had selected.
    pub fn last_dataset(&self) -> Result<Option<String>> {
        self.get(DATASET_KEY)
    }

    pub fn set_last_dataset(&self, name: &str) -> Result<()> {
        self.set(DATASET_KEY, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_config() -> Config {
        Config::open(":memory:").unwrap()
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let config = mem_config();
        assert!(config.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing() {
        let config = mem_config();
        config.set("k", "old").unwrap();
        config.set("k", "new").unwrap();
        assert_eq!(config.get("k").unwrap().unwrap(), "new");
    }

    #[test]
    fn remove_deletes_key() {
        let config = mem_config();
        config.set("k", "v").unwrap();
        config.remove("k").unwrap();
        assert!(config.get("k").unwrap().is_none());
    }

    #[test]
    fn remove_nonexistent_is_ok() {
        let config = mem_config();
        config.remove("nonexistent").unwrap();
    }

    #[test]
    fn page_size_round_trip() {
        let config = mem_config();
        assert!(config.page_size().unwrap().is_none());
        config.set_page_size(50).unwrap();
        assert_eq!(config.page_size().unwrap(), Some(50));
    }

    #[test]
    fn page_size_garbage_counts_as_unset() {
        let config = mem_config();
        config.set("page_size", "a lot").unwrap();
        assert!(config.page_size().unwrap().is_none());
    }

    #[test]
    fn last_dataset_round_trip() {
        let config = mem_config();
        assert!(config.last_dataset().unwrap().is_none());
        config.set_last_dataset("evals").unwrap();
        assert_eq!(config.last_dataset().unwrap().unwrap(), "evals");
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-test.db");
        let path_str = path.to_str().unwrap();

        {
            let config = Config::open(path_str).unwrap();
            config.set_page_size(100).unwrap();
        }

        {
            let config = Config::open(path_str).unwrap();
            assert_eq!(config.page_size().unwrap(), Some(100));
        }
    }
}
