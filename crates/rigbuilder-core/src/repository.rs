//! Persistence of the configuration document and the cart snapshot

use thiserror::Error;

use crate::cart::CartSnapshot;
use crate::config::{ConfigData, ConfigError};
use crate::storage::{KeyValueStore, StorageError};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Stored configuration is invalid: {0}")]
    Config(#[from] ConfigError),
    #[error("Stored cart is invalid: {0}")]
    Cart(#[from] serde_json::Error),
}

/// What subscribers see when another writer changes the stored document
#[derive(Debug)]
pub enum ExternalChange<'a> {
    Updated(&'a ConfigData),
    Rejected(&'a ConfigError),
}

/// Handle returned by [`ConfigRepository::on_external_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Subscriber = Box<dyn FnMut(ExternalChange<'_>) + Send + Sync>;

/// Loads and saves [`ConfigData`] under one storage key
pub struct ConfigRepository<S> {
    store: S,
    key: String,
    subscribers: Vec<(Subscription, Subscriber)>,
    next_id: u64,
}

impl<S: KeyValueStore> ConfigRepository<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored document.
    ///
    /// An absent key seeds storage with the built-in catalog. A stored
    /// document that fails validation is an error and nothing is written.
    pub fn load(&self) -> Result<ConfigData, RepositoryError> {
        match self.store.get_item(&self.key)? {
            Some(raw) => {
                let config = ConfigData::from_json(&raw)?;
                tracing::info!(
                    "Loaded configuration `{}` with {} parts",
                    self.key,
                    config.part_details.len()
                );
                Ok(config)
            }
            None => {
                let config = ConfigData::builtin();
                self.save(&config)?;
                tracing::info!("No configuration under `{}`, seeded defaults", self.key);
                Ok(config)
            }
        }
    }

    pub fn save(&self, config: &ConfigData) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(config).map_err(ConfigError::from)?;
        self.store.set_item(&self.key, &json)?;
        tracing::info!("Saved configuration `{}`", self.key);
        Ok(())
    }

    pub fn on_external_change<F>(&mut self, callback: F) -> Subscription
    where
        F: FnMut(ExternalChange<'_>) + Send + Sync + 'static,
    {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != subscription);
        self.subscribers.len() != before
    }

    /// Feed a change made by another writer (a storage event from another tab).
    ///
    /// Changes to other keys are ignored and return `None`. A removed key
    /// reads as the built-in catalog, matching [`load`](Self::load).
    pub fn notify_external_change(
        &mut self,
        key: &str,
        raw: Option<&str>,
    ) -> Option<Result<ConfigData, ConfigError>> {
        if key != self.key {
            return None;
        }
        let result = match raw {
            Some(raw) => ConfigData::from_json(raw),
            None => Ok(ConfigData::builtin()),
        };

        match &result {
            Ok(config) => {
                tracing::info!("Configuration `{}` changed externally", self.key);
                for (_, subscriber) in &mut self.subscribers {
                    subscriber(ExternalChange::Updated(config));
                }
            }
            Err(e) => {
                tracing::warn!("Ignoring invalid external change to `{}`: {}", self.key, e);
                for (_, subscriber) in &mut self.subscribers {
                    subscriber(ExternalChange::Rejected(e));
                }
            }
        }
        Some(result)
    }
}

/// Holds the single most recent cart snapshot
pub struct CartRepository<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> CartRepository<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Replace any previous snapshot
    pub fn store(&self, snapshot: &CartSnapshot) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(snapshot)?;
        self.store.set_item(&self.key, &json)?;
        tracing::info!("Stored cart with {} components", snapshot.components.len());
        Ok(())
    }

    pub fn load(&self) -> Result<Option<CartSnapshot>, RepositoryError> {
        match self.store.get_item(&self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Checkout: drop the snapshot
    pub fn clear(&self) -> Result<(), RepositoryError> {
        self.store.remove_item(&self.key)?;
        tracing::info!("Cleared cart `{}`", self.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{PartDetail, PartKey};
    use crate::selection::SelectionState;
    use crate::storage::{FileStore, MemoryStore};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_load_seeds_default_when_absent() {
        let store = MemoryStore::new();
        let repo = ConfigRepository::new(store.clone(), "pcConfig");

        let config = repo.load().unwrap();
        assert_eq!(config, ConfigData::builtin());
        assert!(store.get_item("pcConfig").unwrap().is_some());
    }

    #[test]
    fn test_invalid_stored_document_is_not_applied() {
        let store = MemoryStore::new();
        store.set_item("pcConfig", "{\"meshMap\": {}}").unwrap();
        let repo = ConfigRepository::new(store.clone(), "pcConfig");

        assert!(matches!(repo.load(), Err(RepositoryError::Config(_))));
        // Not overwritten with defaults
        assert_eq!(
            store.get_item("pcConfig").unwrap().as_deref(),
            Some("{\"meshMap\": {}}")
        );
    }

    #[test]
    fn test_save_then_load_in_other_tab() {
        let store = MemoryStore::new();
        let tab_a = ConfigRepository::new(store.clone(), "pcConfig");
        let tab_b = ConfigRepository::new(store, "pcConfig");

        let config = ConfigData::builtin()
            .add_part("chair", PartDetail::new("Chair", 89.0, ""))
            .unwrap();
        tab_a.save(&config).unwrap();
        assert_eq!(tab_b.load().unwrap(), config);
    }

    #[test]
    fn test_external_change_dispatch() {
        let mut repo = ConfigRepository::new(MemoryStore::new(), "pcConfig");
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();

        let sink = seen.clone();
        let subscription = repo.on_external_change(move |change| {
            let entry = match change {
                ExternalChange::Updated(config) => format!("updated:{}", config.part_details.len()),
                ExternalChange::Rejected(_) => "rejected".to_string(),
            };
            sink.lock().unwrap().push(entry);
        });

        let other = ConfigData::default()
            .add_part("desk", PartDetail::new("Desk", 10.0, ""))
            .unwrap();
        let raw = serde_json::to_string(&other).unwrap();

        assert!(repo.notify_external_change("pcCart", Some(&raw)).is_none());
        assert_eq!(
            repo.notify_external_change("pcConfig", Some(&raw)).unwrap().unwrap(),
            other
        );
        assert!(repo
            .notify_external_change("pcConfig", Some("{broken"))
            .unwrap()
            .is_err());
        assert_eq!(
            repo.notify_external_change("pcConfig", None).unwrap().unwrap(),
            ConfigData::builtin()
        );

        assert!(repo.unsubscribe(subscription));
        assert!(!repo.unsubscribe(subscription));
        repo.notify_external_change("pcConfig", Some(&raw));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["updated:1", "rejected", "updated:6"]
        );
    }

    #[test]
    fn test_cart_store_load_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        let carts = CartRepository::new(store, "pcCart");
        assert!(carts.load().unwrap().is_none());

        let config = ConfigData::builtin();
        let mut selection = SelectionState::all_configurable(&config);
        selection
            .toggle(&PartKey::parse("pc").unwrap(), &config)
            .unwrap();
        let snapshot =
            CartSnapshot::capture("data:image/png;base64,AA==".to_string(), &selection, &config)
                .unwrap();

        carts.store(&snapshot).unwrap();
        assert_eq!(carts.load().unwrap(), Some(snapshot));

        carts.clear().unwrap();
        assert!(carts.load().unwrap().is_none());
    }
}
