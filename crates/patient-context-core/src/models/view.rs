//! What a dependent view should render.

use serde::{Deserialize, Serialize};

use super::PatientId;

/// Target of a patient-scoped view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewTarget {
    /// Render the selected patient's record.
    Patient { id: PatientId },
    /// No patient resolved; render the signed-in user's own profile.
    SelfProfile { user_id: String },
}

impl ViewTarget {
    /// Pick the view target, falling back to the signed-in user's profile.
    pub fn for_context(active: Option<&PatientId>, signed_in_user: &str) -> Self {
        match active {
            Some(id) => ViewTarget::Patient { id: id.clone() },
            None => ViewTarget::SelfProfile {
                user_id: signed_in_user.to_string(),
            },
        }
    }

    pub fn is_self_view(&self) -> bool {
        matches!(self, ViewTarget::SelfProfile { .. })
    }
}
