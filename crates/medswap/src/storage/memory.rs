//! In-process slot backend.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Error, Result};

use super::{Slot, SlotBackend};

/// Slot backend kept in memory, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: RefCell<HashMap<String, Slot>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether no slot has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl SlotBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Slot>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str, expected_version: u64) -> Result<u64> {
        let mut slots = self.slots.borrow_mut();
        let current = slots.get(key).map_or(0, |s| s.version);
        if current != expected_version {
            return Err(Error::slot_conflict(key, expected_version));
        }

        let version = current + 1;
        slots.insert(
            key.to_string(),
            Slot {
                value: value.to_string(),
                version,
            },
        );
        Ok(version)
    }
}
