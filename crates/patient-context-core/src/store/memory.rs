//! In-memory slot backend.

use std::collections::HashMap;

use super::{SlotBackend, StoreError, StoreResult};

/// Slots held in a map, with an optional byte quota.
///
/// The quota counts name and value bytes of every entry, like browser
/// storage quotas do.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit total stored bytes; writes past the limit fail.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            slots: HashMap::new(),
            quota: Some(limit),
        }
    }

    fn used_bytes(&self) -> usize {
        self.slots.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl SlotBackend for MemoryBackend {
    fn get(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(self.slots.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> StoreResult<()> {
        if let Some(limit) = self.quota {
            let replaced = self
                .slots
                .get(name)
                .map(|v| name.len() + v.len())
                .unwrap_or(0);
            let needed = self.used_bytes() - replaced + name.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded {
                    name: name.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.slots.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> StoreResult<()> {
        self.slots.remove(name);
        Ok(())
    }
}
