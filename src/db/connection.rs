//! Store connection management using rusqlite
//!
//! A `Store` is the explicit handle to one SQLite file. It keeps a writer
//! connection for ingestion and a query-only reader connection for
//! introspection and execution, so reads never go through a connection that
//! can write.

use crate::config::{GatewayConfig, DEFAULT_BUSY_TIMEOUT_MS};
use crate::error::{GatewayError, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

pub struct Store {
    path: PathBuf,
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the store at `path` with the default busy timeout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    pub fn open_with_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;
        Self::open_with_timeout(&config.db_path, config.busy_timeout)
    }

    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = path.to_string_lossy();
        if raw.is_empty() || raw == ":memory:" || raw.starts_with("file::memory:") {
            return Err(GatewayError::InvalidInput(
                "store must be a file path; in-memory databases are not supported".to_string(),
            ));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer = open_connection(&path, busy_timeout)?;
        let journal_mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        writer.pragma_update(None, "foreign_keys", true)?;
        debug!("Store writer journal_mode={}", journal_mode);

        let reader = open_connection(&path, busy_timeout)?;
        reader.pragma_update(None, "query_only", true)?;

        info!("Opened store at {}", path.display());
        Ok(Self {
            path,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on the query-only connection.
    pub fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = lock(&self.reader)?;
        f(&conn)
    }

    /// Run `f` on the writer connection. Only the ingestion path uses this.
    pub fn with_writer<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = lock(&self.writer)?;
        f(&mut conn)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| GatewayError::Database(format!("Failed to open store {}: {}", path.display(), e)))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| GatewayError::Database("store connection lock poisoned".to_string()))
}

/// Quote an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file_and_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/app.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_wal_mode_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(temp_dir.path().join("app.db")).unwrap();
        let mode: String = store
            .with_reader(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_reader_refuses_writes() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(temp_dir.path().join("app.db")).unwrap();
        let result = store.with_reader(|conn| Ok(conn.execute_batch("CREATE TABLE x (a INTEGER)")?));
        assert!(result.is_err());

        store
            .with_writer(|conn| Ok(conn.execute_batch("CREATE TABLE x (a INTEGER)")?))
            .unwrap();
    }

    #[test]
    fn test_in_memory_rejected() {
        assert!(matches!(Store::open(":memory:"), Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("sales"), "\"sales\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
