//! Patient identifier model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Textual values that mean "no selection" even though they are non-empty.
///
/// These leak into storage when a caller stringifies a missing value.
pub const ABSENT_MARKERS: [&str; 2] = ["null", "undefined"];

/// Opaque patient identifier (a UUID in practice).
///
/// Never empty and never one of [`ABSENT_MARKERS`]. Shape is not validated
/// here; see [`crate::normalizer::is_valid_uuid`] for the strict check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    /// Wrap a raw value, returning `None` when it means "no selection".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if is_absent(&value) {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this identifier has the canonical UUID v1-v5 shape.
    pub fn is_uuid(&self) -> bool {
        crate::normalizer::is_valid_uuid(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Check if a raw value should be treated as "no selection".
pub fn is_absent(value: &str) -> bool {
    value.is_empty() || ABSENT_MARKERS.contains(&value)
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PatientId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PatientId::new(value.clone()).ok_or(value)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}
