//! Persistence adapter: string blobs under fixed keys, hot cache (DashMap) over Sled.
//!
//! Every mutation of the store commits one batch holding the full snapshot. Backends apply a
//! batch all-or-nothing, so a crash mid-commit cannot leave half a transition on disk.

use crate::error::{StorageError, StorageResult};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Level registry blob: JSON object of level id -> level.
pub const LEVELS_KEY: &str = "mp_levels";
/// Current level pointer, stored as the raw id.
pub const CURRENT_LEVEL_KEY: &str = "mp_current_level_id";
/// Navigation history: JSON array of level ids.
pub const NAV_HISTORY_KEY: &str = "mp_nav_history";
/// Pin collection: JSON array of pins in insertion order.
pub const PINS_KEY: &str = "mp_pins";

/// Synchronous key/value backend for UTF-8 blobs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes every entry or none of them.
    fn write_batch(&self, entries: &[(&str, String)]) -> StorageResult<()>;

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Sled database with a read-through / write-through hot cache.
pub struct SledStore {
    db: Db,
    cache: Arc<DashMap<String, String>>,
}

impl SledStore {
    /// Opens or creates a Sled database at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            cache: Arc::new(DashMap::new()),
        })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if let Some(v) = self.cache.get(key) {
            return Ok(Some(v.clone()));
        }
        let Some(raw) = self.db.get(key.as_bytes())? else {
            return Ok(None);
        };
        match String::from_utf8(raw.to_vec()) {
            Ok(s) => {
                self.cache.insert(key.to_string(), s.clone());
                Ok(Some(s))
            }
            Err(_) => {
                tracing::warn!(target: "masterplan::storage", key = key, "Persisted value is not UTF-8; ignoring");
                Ok(None)
            }
        }
    }

    fn write_batch(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(key.as_bytes(), value.as_bytes());
        }
        self.db.apply_batch(batch)?;
        for (key, value) in entries {
            self.cache.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-process backend for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every write fails with [`StorageError::Closed`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Seeds a raw value, bypassing the adapter (used to simulate corrupt blobs).
    pub fn put_raw(&self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn write_batch(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        for (key, value) in entries {
            self.entries.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn write_batch(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        (**self).write_batch(entries)
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }
}

/// Value to persist under one key, encoded up front so the batch is all-or-nothing.
pub struct Blob(serde_json::Result<String>);

impl Blob {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Blob(serde_json::to_string(value))
    }

    /// Stored verbatim, without JSON quoting.
    pub fn raw(value: impl Into<String>) -> Self {
        Blob(Ok(value.into()))
    }

    fn into_encoded(self) -> StorageResult<String> {
        Ok(self.0?)
    }
}

/// Fault-absorbing front of a [`KeyValueStore`]. Reads degrade to `None`; writes log and
/// report `false`. Nothing here ever reaches the caller as an error.
pub struct PersistenceAdapter {
    backend: Box<dyn KeyValueStore>,
    quota: Option<usize>,
}

impl PersistenceAdapter {
    pub fn new(backend: impl KeyValueStore + 'static, quota: Option<usize>) -> Self {
        Self {
            backend: Box::new(backend),
            quota,
        }
    }

    /// Raw string under `key`; backend faults are logged and read as absent.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(v) => v.filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::error!(target: "masterplan::storage", key = key, error = %e, "Failed to read persisted value");
                None
            }
        }
    }

    /// JSON value under `key`; absent or unparsable blobs read as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(
                    target: "masterplan::storage",
                    key = key,
                    error = %e,
                    "Persisted value is corrupt; falling back to default"
                );
                None
            }
        }
    }

    /// Encodes and writes every entry as one batch. Returns `false` when nothing was written.
    pub fn commit(&self, entries: Vec<(&str, Blob)>) -> bool {
        let keys = entries.len();
        match self.try_commit(entries) {
            Ok(bytes) => {
                tracing::debug!(target: "masterplan::storage", keys = keys, bytes = bytes, "Snapshot committed");
                true
            }
            Err(StorageError::QuotaExceeded { needed, quota }) => {
                tracing::warn!(
                    target: "masterplan::storage",
                    needed = needed,
                    quota = quota,
                    "Storage quota exceeded. Some data might not be saved."
                );
                false
            }
            Err(e) => {
                tracing::error!(target: "masterplan::storage", error = %e, "Error saving snapshot");
                false
            }
        }
    }

    fn try_commit(&self, entries: Vec<(&str, Blob)>) -> StorageResult<usize> {
        let encoded = entries
            .into_iter()
            .map(|(key, blob)| Ok((key, blob.into_encoded()?)))
            .collect::<StorageResult<Vec<_>>>()?;
        let needed: usize = encoded.iter().map(|(k, v)| k.len() + v.len()).sum();
        if let Some(quota) = self.quota {
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.backend.write_batch(&encoded)?;
        Ok(needed)
    }

    pub fn flush(&self) {
        if let Err(e) = self.backend.flush() {
            tracing::error!(target: "masterplan::storage", error = %e, "Failed to flush storage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_blob_reads_as_absent() {
        let mem = Arc::new(MemoryStore::new());
        mem.put_raw(PINS_KEY, "[{not json");
        let adapter = PersistenceAdapter::new(Arc::clone(&mem), None);
        assert!(adapter.load::<Vec<String>>(PINS_KEY).is_none());
        assert!(adapter.load::<Vec<String>>(NAV_HISTORY_KEY).is_none());
    }

    #[test]
    fn quota_rejects_whole_batch() {
        let mem = Arc::new(MemoryStore::new());
        let adapter = PersistenceAdapter::new(Arc::clone(&mem), Some(32));
        let small = vec!["master".to_string()];
        let large = "x".repeat(64);
        assert!(!adapter.commit(vec![
            (NAV_HISTORY_KEY, Blob::json(&small)),
            (CURRENT_LEVEL_KEY, Blob::raw(large)),
        ]));
        assert!(mem.raw(NAV_HISTORY_KEY).is_none());
        assert!(mem.raw(CURRENT_LEVEL_KEY).is_none());
    }

    #[test]
    fn rejected_write_is_absorbed() {
        let mem = Arc::new(MemoryStore::new());
        mem.set_reject_writes(true);
        let adapter = PersistenceAdapter::new(Arc::clone(&mem), None);
        assert!(!adapter.commit(vec![(CURRENT_LEVEL_KEY, Blob::raw("master"))]));
        mem.set_reject_writes(false);
        assert!(adapter.commit(vec![(CURRENT_LEVEL_KEY, Blob::raw("master"))]));
        assert_eq!(adapter.load_raw(CURRENT_LEVEL_KEY).as_deref(), Some("master"));
    }

    #[test]
    fn sled_batch_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open_path(dir.path()).unwrap();
            store
                .write_batch(&[(CURRENT_LEVEL_KEY, "dist-1".to_string()), (NAV_HISTORY_KEY, "[\"master\"]".to_string())])
                .unwrap();
            store.flush().unwrap();
        }
        let store = SledStore::open_path(dir.path()).unwrap();
        assert_eq!(store.get(CURRENT_LEVEL_KEY).unwrap().as_deref(), Some("dist-1"));
        assert_eq!(store.get(NAV_HISTORY_KEY).unwrap().as_deref(), Some("[\"master\"]"));
        assert!(store.get(PINS_KEY).unwrap().is_none());
    }
}
