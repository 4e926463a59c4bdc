//! Persistence for the saved city list.
//!
//! The list is stored as one JSON document under [`CITIES_KEY`] in a small
//! key/value table, the same shape a browser keeps in local storage. Both
//! implementations share [`decode_cities`], so a corrupted document is
//! handled identically everywhere: logged and treated as an empty list.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use citycast_core::{RusqliteErrorExt, StorageError};
use citycast_weather::City;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

/// Storage slot holding the saved city list
pub const CITIES_KEY: &str = "weatherDashboard-cities";

/// Backing store for [`crate::CityStore`].
///
/// Implementations don't need to be Sync; the dashboard serializes access
/// through a mutex.
pub trait CityStorage: Send {
    /// Load the saved list. A missing slot is an empty list.
    fn load(&self) -> Result<Vec<City>, StorageError>;

    /// Replace the saved list.
    fn save(&self, cities: &[City]) -> Result<(), StorageError>;
}

/// Parse a stored document. Corrupt JSON yields an empty list.
pub fn decode_cities(raw: &str) -> Vec<City> {
    match serde_json::from_str::<Vec<City>>(raw) {
        Ok(cities) => cities,
        Err(e) => {
            tracing::warn!("Saved city list is unreadable, starting empty: {}", e);
            Vec::new()
        }
    }
}

fn encode_cities(cities: &[City]) -> Result<String, StorageError> {
    serde_json::to_string(cities).map_err(|e| StorageError::WriteFailed(e.to_string()))
}

/// SQLite-backed key/value storage.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!("{}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_storage_error)?;
        let storage = Self { conn };
        storage.init_schema()?;
        tracing::debug!("Opened city storage at {}", path.display());
        Ok(storage)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_storage_error)?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
            )
            .map_err(RusqliteErrorExt::into_storage_error)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(RusqliteErrorExt::into_storage_error)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(removed > 0)
    }
}

impl CityStorage for SqliteStorage {
    fn load(&self) -> Result<Vec<City>, StorageError> {
        Ok(self.get(CITIES_KEY)?.map(|raw| decode_cities(&raw)).unwrap_or_default())
    }

    fn save(&self, cities: &[City]) -> Result<(), StorageError> {
        self.set(CITIES_KEY, &encode_cities(cities)?)
    }
}

/// In-memory storage. Clones share the same slot, so a test can keep a
/// handle after moving one into a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw stored document
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let storage = Self::default();
        *storage.slot.lock() = Some(raw.into());
        storage
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    /// Make subsequent saves fail with `WriteFailed`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl CityStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<City>, StorageError> {
        Ok(self.slot.lock().as_deref().map(decode_cities).unwrap_or_default())
    }

    fn save(&self, cities: &[City]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("storage is read-only".to_string()));
        }
        *self.slot.lock() = Some(encode_cities(cities)?);
        Ok(())
    }
}
