//! Browser local storage and cross-tab change events
//!
//! In the browser the repositories sit on `window.localStorage`, and a
//! `storage` event listener forwards writes made by other tabs into the Bevy
//! world. Native builds keep the same documents in a directory instead.

use bevy::prelude::*;
use rigbuilder_core::StorageError;
use std::sync::{Arc, Mutex};

/// Plugin for cross-tab storage events
pub struct StorageSyncPlugin;

impl Plugin for StorageSyncPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingStorageChanges>()
            .add_systems(Startup, listen_for_storage_changes);
    }
}

/// A write to local storage made by another tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// `None` when the other tab cleared all of storage
    pub key: Option<String>,
    pub new_value: Option<String>,
}

/// Storage changes from JavaScript callbacks, drained by the sync systems
#[derive(Resource, Default, Clone)]
pub struct PendingStorageChanges(pub Arc<Mutex<Vec<StorageChange>>>);

impl PendingStorageChanges {
    pub fn take(&self) -> Vec<StorageChange> {
        match self.0.lock() {
            Ok(mut changes) => std::mem::take(&mut *changes),
            Err(_) => Vec::new(),
        }
    }
}

fn listen_for_storage_changes(pending: Res<PendingStorageChanges>) {
    js_interop::listen_for_storage_changes(pending.0.clone());
}

/// Store backing both repositories on this platform
#[cfg(target_arch = "wasm32")]
pub type AppStore = js_interop::LocalStore;
#[cfg(not(target_arch = "wasm32"))]
pub type AppStore = rigbuilder_core::FileStore;

pub fn open_store() -> Result<AppStore, StorageError> {
    js_interop::open_store()
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use rigbuilder_core::KeyValueStore;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    /// `window.localStorage`, looked up on every call since the handle is
    /// not `Send`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LocalStore;

    fn js_error(context: &str, e: JsValue) -> StorageError {
        StorageError::Backend(format!("{}: {:?}", context, e))
    }

    fn local_storage() -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Backend("no window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| js_error("localStorage denied", e))?
            .ok_or_else(|| StorageError::Backend("localStorage not available".to_string()))
    }

    impl KeyValueStore for LocalStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            local_storage()?
                .get_item(key)
                .map_err(|e| js_error("getItem failed", e))
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            // Quota errors land here
            local_storage()?
                .set_item(key, value)
                .map_err(|e| js_error("setItem failed", e))
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            local_storage()?
                .remove_item(key)
                .map_err(|e| js_error("removeItem failed", e))
        }
    }

    pub fn open_store() -> Result<LocalStore, StorageError> {
        // Fail early if storage is blocked (private mode, sandboxed iframe)
        local_storage()?;
        Ok(LocalStore)
    }

    /// Register a `storage` listener on the window. The browser only fires it
    /// for writes made by other documents on the same origin.
    pub fn listen_for_storage_changes(pending: Arc<Mutex<Vec<StorageChange>>>) {
        let Some(window) = web_sys::window() else {
            tracing::error!("listen_for_storage_changes: no window object");
            return;
        };

        let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Ok(event) = event.dyn_into::<web_sys::StorageEvent>() else {
                return;
            };
            if let Ok(mut changes) = pending.lock() {
                changes.push(StorageChange {
                    key: event.key(),
                    new_value: event.new_value(),
                });
            }
        }) as Box<dyn FnMut(_)>);

        if let Err(e) =
            window.add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref())
        {
            tracing::error!("Failed to listen for storage events: {:?}", e);
        }
        closure.forget();
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;
    use rigbuilder_core::FileStore;

    pub fn open_store() -> Result<FileStore, StorageError> {
        FileStore::new(std::env::temp_dir().join("rigbuilder"))
    }

    pub fn listen_for_storage_changes(_pending: Arc<Mutex<Vec<StorageChange>>>) {
        // Only one writer per directory on native
    }
}
