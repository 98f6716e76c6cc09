//! Storage shared by the tabs of one origin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, Weak};

use super::{KeyStore, MemoryBackend, SlotBackend, StoreError, StoreResult, TabId};
use crate::models::StorageEvent;

struct Listener {
    id: u64,
    tab: TabId,
    sender: Sender<StorageEvent>,
}

/// Slot storage for one origin, shared across tabs.
///
/// A change made through one tab is announced to every other subscribed
/// tab, never to the tab that made it. Writes that leave a slot unchanged
/// are not announced.
pub struct OriginStorage {
    backend: Mutex<Box<dyn SlotBackend>>,
    listeners: Mutex<Vec<Listener>>,
    next_tab: AtomicU64,
    next_listener: AtomicU64,
}

impl OriginStorage {
    /// Create origin storage over a backend.
    pub fn new<B: SlotBackend + 'static>(backend: B) -> Arc<Self> {
        Arc::new(Self {
            backend: Mutex::new(Box::new(backend)),
            listeners: Mutex::new(Vec::new()),
            next_tab: AtomicU64::new(1),
            next_listener: AtomicU64::new(1),
        })
    }

    /// Origin storage held in memory only.
    pub fn in_memory() -> Arc<Self> {
        Self::new(MemoryBackend::new())
    }

    /// Open a new tab on this origin.
    pub fn open_tab(self: &Arc<Self>) -> KeyStore {
        let tab = self.next_tab.fetch_add(1, Ordering::Relaxed);
        KeyStore::new(Arc::clone(self), tab)
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub(crate) fn read(&self, name: &str) -> StoreResult<Option<String>> {
        let backend = self.backend.lock().map_err(|_| StoreError::Lock)?;
        backend.get(name)
    }

    pub(crate) fn write(&self, tab: TabId, name: &str, value: &str) -> StoreResult<()> {
        {
            let mut backend = self.backend.lock().map_err(|_| StoreError::Lock)?;
            let previous = backend.get(name)?;
            if previous.as_deref() == Some(value) {
                return Ok(());
            }
            backend.set(name, value)?;
        }
        self.broadcast(tab, StorageEvent::set(name, value))
    }

    pub(crate) fn remove(&self, tab: TabId, name: &str) -> StoreResult<()> {
        {
            let mut backend = self.backend.lock().map_err(|_| StoreError::Lock)?;
            if backend.get(name)?.is_none() {
                return Ok(());
            }
            backend.remove(name)?;
        }
        self.broadcast(tab, StorageEvent::removed(name))
    }

    pub(crate) fn subscribe(self: &Arc<Self>, tab: TabId) -> StoreResult<Subscription> {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);

        self.listeners
            .lock()
            .map_err(|_| StoreError::Lock)?
            .push(Listener { id, tab, sender });

        Ok(Subscription {
            id,
            tab,
            receiver,
            origin: Arc::downgrade(self),
        })
    }

    fn unsubscribe(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|l| l.id != id);
        }
    }

    fn broadcast(&self, from: TabId, event: StorageEvent) -> StoreResult<()> {
        let mut listeners = self.listeners.lock().map_err(|_| StoreError::Lock)?;
        // Drop listeners whose receiving end is gone
        listeners.retain(|l| l.tab == from || l.sender.send(event.clone()).is_ok());
        Ok(())
    }
}

/// Receives slot changes made by other tabs. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    tab: TabId,
    receiver: Receiver<StorageEvent>,
    origin: Weak<OriginStorage>,
}

impl Subscription {
    pub fn tab_id(&self) -> TabId {
        self.tab
    }

    /// Next pending event, if any.
    pub fn try_next(&self) -> Option<StorageEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// All pending events, oldest first.
    pub fn drain(&self) -> Vec<StorageEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.upgrade() {
            origin.unsubscribe(self.id);
        }
    }
}
