//! Active patient context state.

use serde::{Deserialize, Serialize};

use super::PatientId;

/// Resolution state of the active patient context for one tab.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "patient_id", rename_all = "snake_case")]
pub enum ContextState {
    /// Routing information is not available yet.
    #[default]
    Unresolved,
    /// Resolution ran; `None` means no patient is selected.
    Resolved(Option<PatientId>),
}

impl ContextState {
    /// The active patient, if resolved to one.
    pub fn active(&self) -> Option<&PatientId> {
        match self {
            ContextState::Resolved(Some(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ContextState::Resolved(_))
    }

    /// Check whether adopting `candidate` would change the held value.
    pub fn differs_from(&self, candidate: &PatientId) -> bool {
        self.active() != Some(candidate)
    }
}

/// Where a context change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Query parameter on the current route.
    Query,
    /// One of the known storage slots, read during resolution.
    Storage,
    /// Storage change notification from another tab.
    CrossTab,
    /// Explicit selection elsewhere in the UI.
    Selection,
    /// Selection cleared (sign-out).
    Cleared,
}

impl ChangeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeSource::Query => "query",
            ChangeSource::Storage => "storage",
            ChangeSource::CrossTab => "cross_tab",
            ChangeSource::Selection => "selection",
            ChangeSource::Cleared => "cleared",
        }
    }
}
