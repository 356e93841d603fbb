//! Key/value persistence for client state.
//!
//! The analyzer never touches `window.localStorage` directly; it goes through
//! [`StateStore`] so tests and non-browser hosts can swap in [`MemoryStore`].

use std::cell::RefCell;
use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

/// Number of analyses used in the current window, as a decimal string.
pub const ANALYSIS_COUNT_KEY: &str = "analysisCount";
/// Start of the current quota window, as epoch milliseconds.
pub const LAST_RESET_TIME_KEY: &str = "lastResetTime";
/// Data URL of the most recent upload.
pub const LAST_IMAGE_KEY: &str = "lastImage";

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Storage unavailable")]
    Unavailable,

    #[error("Failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
}

pub trait StateStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// In-memory store. Interior mutability keeps the trait `&self` like the
/// browser API it stands in for.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// Browser `localStorage`, one origin, no cross-tab coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl StateStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let storage = Self::storage().ok_or(StoreError::Unavailable)?;
        storage.set_item(key, value).map_err(|e| StoreError::Write {
            key: key.to_string(),
            // Large data URLs routinely hit the per-origin quota.
            reason: e.as_string().unwrap_or_else(|| format!("{:?}", e)),
        })
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            if storage.remove_item(key).is_err() {
                warn!("Failed to remove '{}' from local storage", key);
            }
        }
    }

    fn clear(&self) {
        if let Some(storage) = Self::storage() {
            if storage.clear().is_err() {
                warn!("Failed to clear local storage");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(ANALYSIS_COUNT_KEY).is_none());

        store.set(ANALYSIS_COUNT_KEY, "3").unwrap();
        assert_eq!(store.get(ANALYSIS_COUNT_KEY), Some("3".to_string()));

        store.remove(ANALYSIS_COUNT_KEY);
        assert!(store.get(ANALYSIS_COUNT_KEY).is_none());
    }

    #[test]
    fn test_memory_store_overwrite() {
        let store = MemoryStore::new();
        store.set(LAST_RESET_TIME_KEY, "1").unwrap();
        store.set(LAST_RESET_TIME_KEY, "2").unwrap();
        assert_eq!(store.get(LAST_RESET_TIME_KEY), Some("2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryStore::new();
        store.set(ANALYSIS_COUNT_KEY, "1").unwrap();
        store.set(LAST_IMAGE_KEY, "data:image/png;base64,AA==").unwrap();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_by_reference() {
        let store = MemoryStore::new();
        let by_ref: &MemoryStore = &store;
        by_ref.set(ANALYSIS_COUNT_KEY, "4").unwrap();
        assert_eq!(store.get(ANALYSIS_COUNT_KEY), Some("4".to_string()));
    }
}
