//! `SQLite`-backed slot storage.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{migrations, Slot, SlotBackend};

/// Slot backend persisted in a `SQLite` database file.
///
/// Several processes may open the same file; the version check in
/// [`SlotBackend::write`] is a single conditional statement, so a stale
/// writer gets a conflict instead of overwriting newer data.
#[derive(Debug)]
pub struct SqliteBackend {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_db_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| Error::internal(format!("slot version {version} overflows")))
}

impl SlotBackend for SqliteBackend {
    fn read(&self, key: &str) -> Result<Option<Slot>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT value, version FROM slots WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(value, version)| Slot {
            value,
            version: u64::try_from(version).unwrap_or(0),
        }))
    }

    fn write(&self, key: &str, value: &str, expected_version: u64) -> Result<u64> {
        let affected = if expected_version == 0 {
            self.conn.execute(
                r"
                INSERT INTO slots (key, value, version) VALUES (?1, ?2, 1)
                ON CONFLICT(key) DO NOTHING
                ",
                params![key, value],
            )?
        } else {
            self.conn.execute(
                r"
                UPDATE slots SET value = ?2, version = version + 1, updated_at = datetime('now')
                WHERE key = ?1 AND version = ?3
                ",
                params![key, value, to_db_version(expected_version)?],
            )?
        };

        if affected == 0 {
            debug!(key, expected_version, "Stale slot write rejected");
            return Err(Error::slot_conflict(key, expected_version));
        }
        Ok(expected_version + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormData;
    use crate::storage::{RecordStore, DEFAULT_SLOT_KEY};

    fn create_test_backend() -> SqliteBackend {
        SqliteBackend::open_in_memory().expect("failed to create test backend")
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("medswap_{tag}_{}.db", std::process::id()))
    }

    fn remove_db(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_in_memory() {
        let backend = create_test_backend();
        assert_eq!(backend.path(), Path::new(":memory:"));
    }

    #[test]
    fn test_read_absent() {
        let backend = create_test_backend();
        assert!(backend.read("missing").unwrap().is_none());
    }

    #[test]
    fn test_write_and_read() {
        let backend = create_test_backend();
        assert_eq!(backend.write("k", "[1]", 0).unwrap(), 1);
        assert_eq!(backend.write("k", "[1,2]", 1).unwrap(), 2);

        let slot = backend.read("k").unwrap().unwrap();
        assert_eq!(slot.value, "[1,2]");
        assert_eq!(slot.version, 2);
    }

    #[test]
    fn test_stale_insert_conflicts() {
        let backend = create_test_backend();
        backend.write("k", "a", 0).unwrap();
        assert!(backend.write("k", "b", 0).unwrap_err().is_conflict());
    }

    #[test]
    fn test_stale_update_conflicts() {
        let backend = create_test_backend();
        backend.write("k", "a", 0).unwrap();
        backend.write("k", "b", 1).unwrap();
        assert!(backend.write("k", "c", 1).unwrap_err().is_conflict());
        assert_eq!(backend.read("k").unwrap().unwrap().value, "b");
    }

    #[test]
    fn test_two_connections_do_not_lose_updates() {
        let path = temp_db_path("two_writers");
        remove_db(&path);

        let first = RecordStore::new(SqliteBackend::open(&path).unwrap(), DEFAULT_SLOT_KEY);
        let second = RecordStore::new(SqliteBackend::open(&path).unwrap(), DEFAULT_SLOT_KEY);

        // A stale version from the first handle must not clobber the second's append.
        let stale = first.backend().read(DEFAULT_SLOT_KEY).unwrap();
        assert!(stale.is_none());
        second
            .append(FormData::new().with("name", "Bea").to_registration())
            .unwrap();
        assert!(first
            .backend()
            .write(DEFAULT_SLOT_KEY, "[]", 0)
            .unwrap_err()
            .is_conflict());

        first
            .append(FormData::new().with("name", "Abe").to_registration())
            .unwrap();
        let names: Vec<String> = second
            .load()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Bea".to_string(), "Abe".to_string()]);

        drop(first);
        drop(second);
        remove_db(&path);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("medswap_test_{}", std::process::id()));
        let nested_path = root.join("nested/medswap.db");
        let _ = std::fs::remove_dir_all(&root);

        let backend = SqliteBackend::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(backend);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_data_survives_reopen() {
        let path = temp_db_path("reopen");
        remove_db(&path);

        {
            let store = RecordStore::new(SqliteBackend::open(&path).unwrap(), DEFAULT_SLOT_KEY);
            store
                .append(
                    FormData::new()
                        .with("userType", "donor")
                        .with("name", "Alice")
                        .with("quantity", "10")
                        .to_registration(),
                )
                .unwrap();
        }

        let store = RecordStore::new(SqliteBackend::open(&path).unwrap(), DEFAULT_SLOT_KEY);
        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Alice");
        assert_eq!(records[0].quantity, 10);

        drop(store);
        remove_db(&path);
    }
}
