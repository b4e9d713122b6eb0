//! Key/value storage for client-side state.
//!
//! Values are JSON text. Backends may enforce a quota over the total size of
//! what they hold; a write that would exceed it fails with
//! [`StorageError::QuotaExceeded`] and leaves the previous value in place.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::form_urlencoded;

use crate::error::StorageError;

/// Synchronous key/value storage shared by the selection store and the caches.
pub trait StorageBackend: Send + Sync {
    /// The value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the value does not fit.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Every stored key.
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

fn check_quota(quota: Option<usize>, needed: usize) -> Result<(), StorageError> {
    match quota {
        Some(available) if needed > available => {
            Err(StorageError::QuotaExceeded { needed, available })
        }
        _ => Ok(()),
    }
}

/// In-process storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage holding at most `bytes` of keys and values.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(self.quota, others + key.len() + value.len())?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// One `{key}.json` file per key in a directory.
///
/// Several processes may share the directory. Writes go through a temporary
/// file renamed into place, so readers never see a partial value; concurrent
/// writers to the same key simply race and the last rename wins.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
}

const EXTENSION: &str = "json";

impl FileStorage {
    /// Storage in `dir`, created if missing.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota: None })
    }

    /// Limit the total size of the stored files.
    #[must_use]
    pub const fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", file_stem(key)))
    }

    /// Bytes used by every stored file except `skip`.
    fn used_except(&self, skip: &Path) -> Result<usize, StorageError> {
        let mut used = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path == skip || path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let len = fs::metadata(&path).map_or(0, |meta| meta.len());
            used = used.saturating_add(usize::try_from(len).unwrap_or(usize::MAX));
        }
        Ok(used)
    }
}

/// File name for a key, percent-encoded so that distinct keys never share a
/// file and no key can leave the directory.
fn file_stem(key: &str) -> String {
    form_urlencoded::byte_serialize(key.as_bytes()).collect()
}

/// The key a file stem was written for, if it was written by [`file_stem`].
fn key_from_stem(stem: &str) -> Option<String> {
    let key = form_urlencoded::parse(stem.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())?;
    (file_stem(&key) == stem).then_some(key)
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        if self.quota.is_some() {
            check_quota(self.quota, self.used_except(&path)? + value.len())?;
        }

        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION)
                && let Some(key) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(key_from_stem)
            {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_roundtrip_and_sharing() {
        let storage = MemoryStorage::new();
        let shared = storage.clone();
        storage.set("a", "[1]").unwrap();
        assert_eq!(shared.get("a").unwrap().as_deref(), Some("[1]"));
        shared.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        storage.remove("a").unwrap();
    }

    #[test]
    fn test_memory_quota_keeps_previous_value() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "12345").unwrap();
        let err = storage.set("k", "1234567890").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 11, available: 10 }));
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn test_memory_quota_replacing_value_does_not_double_count() {
        let storage = MemoryStorage::with_quota(6);
        storage.set("k", "12345").unwrap();
        storage.set("k", "54321").unwrap();
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert_eq!(storage.get("boutique_produits").unwrap(), None);

        storage.set("boutique_produits", "[]").unwrap();
        assert_eq!(
            storage.get("boutique_produits").unwrap().as_deref(),
            Some("[]")
        );
        assert!(dir.path().join("boutique_produits.json").exists());
        assert_eq!(storage.keys().unwrap(), vec!["boutique_produits".to_owned()]);

        storage.remove("boutique_produits").unwrap();
        storage.remove("boutique_produits").unwrap();
        assert_eq!(storage.get("boutique_produits").unwrap(), None);
    }

    #[test]
    fn test_file_storage_shared_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStorage::new(dir.path()).unwrap();
        let second = FileStorage::new(dir.path()).unwrap();
        first.set("campagne_produits", "[1]").unwrap();
        assert_eq!(
            second.get("campagne_produits").unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[test]
    fn test_file_storage_quota() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap().with_quota(8);
        storage.set("a", "1234").unwrap();
        storage.set("a", "12345678").unwrap();
        assert!(matches!(
            storage.set("b", "1"),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(storage.get("b").unwrap(), None);
    }

    #[test]
    fn test_key_encoding() {
        assert_eq!(file_stem("boutique_produits"), "boutique_produits");
        assert_eq!(file_stem("search_{q=x}"), "search_%7Bq%3Dx%7D");
        assert_eq!(file_stem("../etc"), "..%2Fetc");
        assert_eq!(file_stem("q=télé"), "q%3Dt%C3%A9l%C3%A9");

        for key in ["search_{q=x&page=2}", "q=télé", "a b+c", "../etc"] {
            assert_eq!(key_from_stem(&file_stem(key)).as_deref(), Some(key));
        }
        assert_eq!(key_from_stem("not=ours"), None);
    }

    #[test]
    fn test_file_storage_keeps_similar_keys_apart() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.set("search_q=télé", "[1]").unwrap();
        storage.set("search_q=tülü", "[2]").unwrap();
        storage.set("search_q_t_l_", "[3]").unwrap();

        assert_eq!(storage.get("search_q=télé").unwrap().as_deref(), Some("[1]"));
        assert_eq!(storage.get("search_q=tülü").unwrap().as_deref(), Some("[2]"));
        assert_eq!(storage.get("search_q=tele").unwrap(), None);

        let mut keys = storage.keys().unwrap();
        keys.sort();
        assert_eq!(keys, ["search_q=télé", "search_q=tülü", "search_q_t_l_"]);
    }
}
