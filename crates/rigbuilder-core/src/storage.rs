//! String key-value storage backends
//!
//! The repositories only need the three operations browser local storage
//! offers. Backends take `&self` the way `window.localStorage` does, so a
//! handle can be cloned and shared freely.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Storage key {0:?} is not usable as a file name")]
    InvalidKey(String),
    #[error("Storage unavailable: {0}")]
    Backend(String),
}

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Clones share the same map, like two tabs on one origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_items<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> Result<T, StorageError> {
        let mut items = self
            .items
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(f(&mut items))
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_items(|items| items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_items(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.with_items(|items| {
            items.remove(key);
        })
    }
}

/// Native store keeping one `{key}.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory
    pub fn new(base_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path backing a key
    pub fn item_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let usable = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !usable {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.item_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.item_path(key)?;
        std::fs::write(&path, value)?;
        tracing::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.item_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_shared_between_clones() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.clone();

        tab_a.set_item("pcConfig", "{}").unwrap();
        assert_eq!(tab_b.get_item("pcConfig").unwrap().as_deref(), Some("{}"));

        tab_b.remove_item("pcConfig").unwrap();
        assert_eq!(tab_a.get_item("pcConfig").unwrap(), None);
        // removing twice is fine
        tab_a.remove_item("pcConfig").unwrap();
    }

    #[test]
    fn test_file_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("storage");

        let store = FileStore::new(dir.clone()).unwrap();
        assert_eq!(store.get_item("pcCart").unwrap(), None);
        store.set_item("pcCart", "{\"a\":1}").unwrap();
        assert!(dir.join("pcCart.json").exists());

        let reopened = FileStore::new(dir).unwrap();
        assert_eq!(
            reopened.get_item("pcCart").unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        reopened.remove_item("pcCart").unwrap();
        assert_eq!(store.get_item("pcCart").unwrap(), None);
        reopened.remove_item("pcCart").unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(
                store.set_item(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}
