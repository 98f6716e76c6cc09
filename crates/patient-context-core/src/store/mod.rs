//! Persistent key store for patient context slots.
//!
//! Slots live in an [`OriginStorage`] shared by every tab of one origin.
//! Each tab talks to it through a [`KeyStore`] handle, which never fails:
//! storage is a convenience cache, so read errors look like "not set" and
//! write errors are dropped after logging.

mod memory;
mod origin;
mod sqlite;

pub use memory::*;
pub use origin::*;
pub use sqlite::*;

use std::sync::Arc;

use thiserror::Error;

/// Storage backend errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Quota exceeded writing {name}: needs {needed} bytes, limit {limit}")]
    QuotaExceeded {
        name: String,
        needed: usize,
        limit: usize,
    },

    #[error("Storage lock poisoned")]
    Lock,

    #[error("Storage unavailable")]
    Unavailable,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A raw slot backend. Name-agnostic; may fail.
pub trait SlotBackend: Send {
    /// Read a slot.
    fn get(&self, name: &str) -> StoreResult<Option<String>>;

    /// Write a slot, replacing any previous value.
    fn set(&mut self, name: &str, value: &str) -> StoreResult<()>;

    /// Remove a slot. Removing a missing slot is not an error.
    fn remove(&mut self, name: &str) -> StoreResult<()>;
}

/// Identifier of one tab (browsing context) within an origin.
pub type TabId = u64;

/// Best-effort slot access for one tab.
///
/// A store without an origin models a context with no persistent storage
/// (server-side rendering, disabled storage).
#[derive(Clone)]
pub struct KeyStore {
    origin: Option<Arc<OriginStorage>>,
    tab: TabId,
}

impl KeyStore {
    pub(crate) fn new(origin: Arc<OriginStorage>, tab: TabId) -> Self {
        Self {
            origin: Some(origin),
            tab,
        }
    }

    /// A store with no underlying mechanism.
    pub fn unavailable() -> Self {
        Self {
            origin: None,
            tab: 0,
        }
    }

    /// Convenience: a fresh in-memory origin with a single tab.
    pub fn in_memory() -> Self {
        OriginStorage::in_memory().open_tab()
    }

    pub fn is_available(&self) -> bool {
        self.origin.is_some()
    }

    pub fn tab_id(&self) -> TabId {
        self.tab
    }

    /// Open another tab on the same origin.
    pub fn open_sibling_tab(&self) -> KeyStore {
        match &self.origin {
            Some(origin) => origin.open_tab(),
            None => KeyStore::unavailable(),
        }
    }

    /// Read a slot. `None` if unset or storage is unavailable.
    pub fn read_slot(&self, name: &str) -> Option<String> {
        let origin = self.origin.as_ref()?;
        match origin.read(name) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(slot = name, "Slot read failed: {e}");
                None
            }
        }
    }

    /// Write a slot. Failures are logged and discarded.
    pub fn write_slot(&self, name: &str, value: &str) {
        let Some(origin) = &self.origin else {
            return;
        };
        if let Err(e) = origin.write(self.tab, name, value) {
            tracing::warn!(slot = name, "Slot write discarded: {e}");
        }
    }

    /// Remove a slot. Failures are logged and discarded.
    pub fn remove_slot(&self, name: &str) {
        let Some(origin) = &self.origin else {
            return;
        };
        if let Err(e) = origin.remove(self.tab, name) {
            tracing::warn!(slot = name, "Slot removal discarded: {e}");
        }
    }

    /// Listen for slot changes made by other tabs.
    pub fn subscribe(&self) -> Option<Subscription> {
        let origin = self.origin.as_ref()?;
        match origin.subscribe(self.tab) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                tracing::debug!(tab = self.tab, "Storage subscription failed: {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("available", &self.is_available())
            .field("tab", &self.tab)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_store_is_silent() {
        let store = KeyStore::unavailable();
        assert!(!store.is_available());

        store.write_slot("a", "\"x\"");
        assert_eq!(store.read_slot("a"), None);
        store.remove_slot("a");
        assert!(store.subscribe().is_none());
        assert!(!store.open_sibling_tab().is_available());
    }

    #[test]
    fn test_read_write_remove() {
        let store = KeyStore::in_memory();
        assert_eq!(store.read_slot("a"), None);

        store.write_slot("a", "\"x\"");
        assert_eq!(store.read_slot("a"), Some("\"x\"".into()));

        store.remove_slot("a");
        assert_eq!(store.read_slot("a"), None);

        // Removing twice is fine
        store.remove_slot("a");
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let origin = OriginStorage::new(MemoryBackend::with_quota(8));
        let store = origin.open_tab();

        store.write_slot("a", "1234");
        assert_eq!(store.read_slot("a"), Some("1234".into()));

        // Exceeds quota; previous value kept, no panic
        store.write_slot("a", "123456789");
        assert_eq!(store.read_slot("a"), Some("1234".into()));
    }

    #[test]
    fn test_sibling_tabs_share_slots() {
        let first = KeyStore::in_memory();
        let second = first.open_sibling_tab();
        assert_ne!(first.tab_id(), second.tab_id());

        first.write_slot("a", "\"x\"");
        assert_eq!(second.read_slot("a"), Some("\"x\"".into()));
    }
}
