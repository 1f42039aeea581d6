// 🗄️ Storage Access - The whole collection as one JSON blob under one key
//
// Two seams:
// - KeyValueStore: string key → string value (memory or SQLite)
// - LoanStorage:   load/save the full ordered collection
//
// Unparsable data fails fast with StorageError::Corrupt and is never
// overwritten by a load.

use crate::error::StorageError;
use crate::loan::LoanApplication;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, error};

/// The single key holding the loan collection
pub const STORAGE_KEY: &str = "tredgate_loans";

// ============================================================================
// KEY-VALUE STORE
// ============================================================================

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process store, used by tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable store: a single `kv` table in a SQLite file (WAL mode)
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }
}

// ============================================================================
// LOAN STORAGE
// ============================================================================

pub trait LoanStorage {
    /// Full collection in creation order; empty when nothing was saved yet
    fn load(&self) -> Result<Vec<LoanApplication>, StorageError>;

    /// Replace the stored collection with `loans`
    fn save(&self, loans: &[LoanApplication]) -> Result<(), StorageError>;
}

/// `LoanStorage` over any key-value store, under [`STORAGE_KEY`]
pub struct KvLoanStorage<K: KeyValueStore> {
    store: K,
}

impl<K: KeyValueStore> KvLoanStorage<K> {
    pub fn new(store: K) -> Self {
        KvLoanStorage { store }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &K {
        &self.store
    }
}

impl<K: KeyValueStore> LoanStorage for KvLoanStorage<K> {
    fn load(&self) -> Result<Vec<LoanApplication>, StorageError> {
        let Some(raw) = self.store.get_item(STORAGE_KEY)? else {
            debug!(key = STORAGE_KEY, "no stored loans, starting empty");
            return Ok(Vec::new());
        };

        let loans: Vec<LoanApplication> = serde_json::from_str(&raw).map_err(|source| {
            error!(key = STORAGE_KEY, error = %source, "stored loans are corrupt");
            StorageError::Corrupt {
                key: STORAGE_KEY.to_string(),
                source,
            }
        })?;

        debug!(count = loans.len(), "loaded loans");
        Ok(loans)
    }

    fn save(&self, loans: &[LoanApplication]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(loans).map_err(StorageError::Serialize)?;
        self.store.set_item(STORAGE_KEY, &raw)?;
        debug!(count = loans.len(), bytes = raw.len(), "saved loans");
        Ok(())
    }
}
