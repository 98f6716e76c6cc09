//! Active patient context resolver.
//!
//! Pipeline per navigation: Route ready? → Query id → Known slots → Adopt → Mirror
//!
//! The resolver owns the tab's [`ContextState`]. It never fails: storage
//! problems degrade to "nothing stored" and the route id stays authoritative
//! for the current page.

mod body;

pub use body::*;

use std::sync::{Arc, Mutex};

use crate::config::{ContextConfig, SlotSet};
use crate::models::{ChangeSource, ContextState, PatientId, RouteState, ViewTarget};
use crate::normalizer::{encode_for_store, Normalizer};
use crate::store::KeyStore;

/// Handle for removing an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(Option<&PatientId>) + Send>;

/// Resolves and holds the active patient for one tab.
pub struct ContextResolver {
    store: KeyStore,
    slots: SlotSet,
    query_param: String,
    body_attribute: String,
    normalizer: Normalizer,
    state: ContextState,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl ContextResolver {
    /// Create a resolver over a tab's store.
    pub fn new(store: KeyStore, config: &ContextConfig) -> Self {
        Self {
            store,
            slots: config.slot_set(),
            query_param: config.query_param.clone(),
            body_attribute: config.body_attribute.clone(),
            normalizer: config.normalizer(),
            state: ContextState::Unresolved,
            observers: Vec::new(),
            next_observer: 1,
        }
    }

    /// Create a resolver with the default slot layout.
    pub fn with_defaults(store: KeyStore) -> Self {
        Self::new(store, &ContextConfig::default())
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// The active patient, if any.
    pub fn active(&self) -> Option<&PatientId> {
        self.state.active()
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn slots(&self) -> &SlotSet {
        &self.slots
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn is_known_slot(&self, name: &str) -> bool {
        self.slots.contains(name)
    }

    /// Run the Resolve transition for a navigation event.
    ///
    /// Does nothing until the route is ready. Returns `true` if the active
    /// patient changed.
    pub fn on_navigation(&mut self, route: &RouteState) -> bool {
        if !route.ready {
            tracing::debug!("Route not ready, context left unresolved");
            return false;
        }

        let from_query = self
            .normalizer
            .candidate_from_query(route.query_value(&self.query_param));

        let (candidate, source) = match from_query {
            Some(id) => (Some(id), ChangeSource::Query),
            None => (self.read_any_known_slot(), ChangeSource::Storage),
        };

        match candidate {
            Some(id) => self.adopt(id, source),
            None => {
                if !self.state.is_resolved() {
                    self.state = ContextState::Resolved(None);
                    tracing::debug!("No patient id in route or storage");
                }
                false
            }
        }
    }

    /// First non-empty normalized value across the known slots, in probe order.
    pub fn read_any_known_slot(&self) -> Option<PatientId> {
        self.slots.iter().find_map(|name| {
            self.normalizer
                .candidate_from_store(self.store.read_slot(name).as_deref())
        })
    }

    /// Write the encoded id into every known slot.
    pub fn mirror(&self, id: &PatientId) {
        let encoded = encode_for_store(id);
        for name in self.slots.iter() {
            self.store.write_slot(name, &encoded);
        }
    }

    /// Adopt an id chosen elsewhere in the UI (e.g. a patient list action).
    ///
    /// Absent markers are ignored. Returns `true` if the active patient changed.
    pub fn select_patient(&mut self, raw: &str) -> bool {
        match PatientId::new(raw) {
            Some(id) => self.adopt(id, ChangeSource::Selection),
            None => {
                tracing::debug!(value = raw, "Ignoring empty patient selection");
                false
            }
        }
    }

    /// Drop the selection and remove every known slot.
    pub fn clear(&mut self) {
        let had_patient = self.active().is_some();
        self.state = ContextState::Resolved(None);
        for name in self.slots.iter() {
            self.store.remove_slot(name);
        }
        if had_patient {
            tracing::info!(source = ChangeSource::Cleared.as_str(), "Active patient cleared");
            self.notify();
        }
    }

    /// Adopt `id` if it differs from the held value, then mirror and notify.
    pub(crate) fn adopt(&mut self, id: PatientId, source: ChangeSource) -> bool {
        if !self.state.differs_from(&id) {
            return false;
        }

        tracing::info!(
            patient_id = id.as_str(),
            source = source.as_str(),
            "Active patient changed"
        );
        self.mirror(&id);
        self.state = ContextState::Resolved(Some(id));
        self.notify();
        true
    }

    /// Register a callback run whenever the active patient changes.
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(Option<&PatientId>) + Send + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Keep a body attribute map in sync with the active patient.
    pub fn bind_body(&mut self, body: Arc<Mutex<BodyAttributes>>) -> ObserverId {
        let name = self.body_attribute.clone();
        if let Ok(mut attributes) = body.lock() {
            attributes.apply(&name, self.active());
        }
        self.subscribe(move |active| {
            if let Ok(mut attributes) = body.lock() {
                attributes.apply(&name, active);
            }
        })
    }

    /// Name and current value of the body attribute.
    pub fn body_attribute(&self) -> (&str, Option<&str>) {
        (
            self.body_attribute.as_str(),
            self.active().map(PatientId::as_str),
        )
    }

    /// What a patient-scoped view should render for the signed-in user.
    pub fn view_target(&self, signed_in_user: &str) -> ViewTarget {
        ViewTarget::for_context(self.active(), signed_in_user)
    }

    fn notify(&mut self) {
        let active = self.state.active().cloned();
        for (_, observer) in self.observers.iter_mut() {
            observer(active.as_ref());
        }
    }
}

impl std::fmt::Debug for ContextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextResolver")
            .field("state", &self.state)
            .field("slots", &self.slots)
            .field("observers", &self.observers.len())
            .finish()
    }
}
