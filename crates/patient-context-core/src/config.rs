//! Context configuration.
//!
//! Slot names are fixed per deployment; legacy aliases exist because older
//! pages read the active patient from different keys.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalizer::Normalizer;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "patient_context_core=info";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Active patient context configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Slot probed first and written by current pages.
    pub primary_slot: String,
    /// Legacy-compatible aliases, probed in this order after the primary.
    pub legacy_slots: Vec<String>,
    /// Route query parameter carrying a deep-linked patient id.
    pub query_param: String,
    /// Body attribute mirroring the active patient id.
    pub body_attribute: String,
    /// Only accept canonical UUIDs read back from storage.
    pub require_uuid_in_storage: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            primary_slot: "activePatientId".into(),
            legacy_slots: vec![
                "patientId".into(),
                "selectedPatientId".into(),
                "currentPatientId".into(),
            ],
            query_param: "id".into(),
            body_attribute: "data-active-patient-id".into(),
            require_uuid_in_storage: false,
        }
    }
}

impl ContextConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check slot names and attribute names.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for name in self.slot_names() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("empty slot name".into()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!("duplicate slot name: {}", name)));
            }
        }

        if self.query_param.trim().is_empty() {
            return Err(ConfigError::Invalid("empty query parameter name".into()));
        }

        if !self.body_attribute.starts_with("data-") || self.body_attribute.len() == "data-".len() {
            return Err(ConfigError::Invalid(format!(
                "body attribute must be a data- attribute: {}",
                self.body_attribute
            )));
        }

        Ok(())
    }

    /// All slot names in probe order.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_slot.as_str()).chain(self.legacy_slots.iter().map(String::as_str))
    }

    pub fn slot_set(&self) -> SlotSet {
        SlotSet {
            names: self.slot_names().map(str::to_string).collect(),
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        if self.require_uuid_in_storage {
            Normalizer::strict()
        } else {
            Normalizer::new()
        }
    }
}

/// The closed, ordered set of known slots, all kept mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSet {
    names: Vec<String>,
}

impl SlotSet {
    /// Slot names in probe order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn primary(&self) -> &str {
        &self.names[0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
