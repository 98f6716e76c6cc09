//! Document body attributes mirrored from the active context.

use std::collections::BTreeMap;

use crate::models::PatientId;

/// Attribute map standing in for the document body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyAttributes {
    attributes: BTreeMap<String, String>,
}

impl BodyAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attribute to the id, or remove it when there is none.
    pub fn apply(&mut self, name: &str, active: Option<&PatientId>) {
        match active {
            Some(id) => {
                self.attributes.insert(name.to_string(), id.to_string());
            }
            None => {
                self.attributes.remove(name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
