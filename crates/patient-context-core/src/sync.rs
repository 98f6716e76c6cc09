//! Cross-tab synchronization of the active patient.
//!
//! Another tab writing a known slot is folded into this tab's context and
//! re-mirrored to every slot. Last write wins; there is no conflict
//! resolution because the id is a navigation aid, not clinical data.

use crate::models::{ChangeSource, StorageEvent};
use crate::resolver::ContextResolver;
use crate::store::{KeyStore, Subscription};

/// Feeds storage changes from other tabs into a resolver.
pub struct CrossTabSynchronizer {
    subscription: Option<Subscription>,
}

impl CrossTabSynchronizer {
    /// Subscribe to the store's origin.
    ///
    /// With no storage available the synchronizer is inert.
    pub fn attach(store: &KeyStore) -> Self {
        let subscription = store.subscribe();
        if subscription.is_none() {
            tracing::debug!("Storage unavailable, cross-tab sync disabled");
        }
        Self { subscription }
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    /// Fold one storage change into the resolver.
    ///
    /// Ignores unknown slots, removals and values equal to the current
    /// context. Returns `true` if the active patient changed.
    pub fn handle_event(resolver: &mut ContextResolver, event: &StorageEvent) -> bool {
        if !resolver.is_known_slot(&event.key) {
            return false;
        }

        let Some(candidate) = resolver
            .normalizer()
            .candidate_from_store(event.new_value.as_deref())
        else {
            tracing::debug!(slot = event.key.as_str(), "Ignoring cleared slot from other tab");
            return false;
        };

        resolver.adopt(candidate, ChangeSource::CrossTab)
    }

    /// Process every pending event, oldest first.
    ///
    /// Events whose value no longer matches storage were superseded by a
    /// later write and are dropped; storage is checked once, before any
    /// event is applied. Returns how many events changed the active patient.
    pub fn pump(&self, resolver: &mut ContextResolver) -> usize {
        let Some(subscription) = &self.subscription else {
            return 0;
        };

        let pending = subscription.drain();
        let current: Vec<StorageEvent> = pending
            .into_iter()
            .filter(|event| {
                let stored = resolver.store().read_slot(&event.key);
                if stored != event.new_value {
                    tracing::debug!(slot = event.key.as_str(), "Dropping superseded storage event");
                    return false;
                }
                true
            })
            .collect();

        current
            .iter()
            .filter(|event| Self::handle_event(resolver, event))
            .count()
    }

    /// Stop listening. Pending events are discarded.
    pub fn detach(&mut self) {
        self.subscription = None;
    }
}
