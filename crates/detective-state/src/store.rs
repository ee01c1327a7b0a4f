//! StateStore — redb-backed persistence for page metrics.
//!
//! Provides typed CRUD operations over URL metrics documents and storage
//! lock entries. All values are JSON-serialized into redb's `&[u8]` value
//! columns. The store supports both on-disk and in-memory backends (the
//! latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::repository::{LockRepository, UrlMetricsRepository};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(URL_METRICS).map_err(map_err!(Table))?;
        txn.open_table(STORAGE_LOCKS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── URL metrics ────────────────────────────────────────────────

    /// Insert or replace the metrics document for a slug.
    pub fn put_url_metrics(&self, doc: &UrlMetricsDocument) -> StateResult<()> {
        let value = serde_json::to_vec(doc).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(URL_METRICS).map_err(map_err!(Table))?;
            table
                .insert(doc.slug.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(slug = %doc.slug, url = %doc.title, "url metrics stored");
        Ok(())
    }

    /// Get the metrics document for a slug.
    pub fn get_url_metrics(&self, slug: &str) -> StateResult<Option<UrlMetricsDocument>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(URL_METRICS).map_err(map_err!(Table))?;
        match table.get(slug).map_err(map_err!(Read))? {
            Some(guard) => {
                let doc: UrlMetricsDocument =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// List all metrics documents.
    pub fn list_url_metrics(&self) -> StateResult<Vec<UrlMetricsDocument>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(URL_METRICS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let doc: UrlMetricsDocument =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(doc);
        }
        Ok(results)
    }

    /// Delete a metrics document. Returns true if it existed.
    pub fn delete_url_metrics(&self, slug: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(URL_METRICS).map_err(map_err!(Table))?;
            existed = table.remove(slug).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%slug, existed, "url metrics deleted");
        Ok(existed)
    }

    // ── Storage locks ──────────────────────────────────────────────

    /// Insert or replace a client's lock entry.
    pub fn put_lock(&self, key: &str, entry: &LockEntry) -> StateResult<()> {
        let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(STORAGE_LOCKS).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a client's lock entry, expired or not.
    pub fn get_lock(&self, key: &str) -> StateResult<Option<LockEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(STORAGE_LOCKS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let entry: LockEntry =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Delete a client's lock entry. Returns true if it existed.
    pub fn delete_lock(&self, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(STORAGE_LOCKS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    /// Delete every lock entry that has expired by `now`. Returns number deleted.
    pub fn purge_expired_locks(&self, now: u64) -> StateResult<u32> {
        // Collect keys in a read transaction first.
        let keys: Vec<String> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(STORAGE_LOCKS).map_err(map_err!(Table))?;
            let mut keys = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let lock: LockEntry =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if lock.is_expired(now) {
                    keys.push(key.value().to_string());
                }
            }
            keys
        };
        if keys.is_empty() {
            return Ok(0);
        }
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count = keys.len() as u32;
        {
            let mut table = txn.open_table(STORAGE_LOCKS).map_err(map_err!(Table))?;
            for key in &keys {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count, "expired storage locks purged");
        Ok(count)
    }
}

impl UrlMetricsRepository for StateStore {
    fn find(&self, slug: &str) -> StateResult<Option<UrlMetricsDocument>> {
        self.get_url_metrics(slug)
    }

    fn save(&self, doc: &UrlMetricsDocument) -> StateResult<()> {
        self.put_url_metrics(doc)
    }
}

impl LockRepository for StateStore {
    fn load_lock(&self, key: &str) -> StateResult<Option<LockEntry>> {
        self.get_lock(key)
    }

    fn store_lock(&self, key: &str, entry: &LockEntry) -> StateResult<()> {
        self.put_lock(key, entry)
    }

    fn clear_lock(&self, key: &str) -> StateResult<bool> {
        self.delete_lock(key)
    }
}
