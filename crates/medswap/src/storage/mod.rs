//! Storage layer for medswap.
//!
//! Records live as one JSON array under a single named slot of a key/value
//! backend. Every append is a whole read-modify-write of that slot, guarded
//! by a per-slot version so concurrent writers cannot silently drop each
//! other's records.

mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use chrono::Utc;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::form::Registration;
use crate::record::{Record, Role, Status};

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Default slot key holding the record list.
pub const DEFAULT_SLOT_KEY: &str = "medswap_users";

/// Default number of append attempts before giving up on conflicts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A stored slot value with its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Raw stored text.
    pub value: String,
    /// Incremented on every write; absent slots are version 0.
    pub version: u64,
}

/// A key/value store holding versioned text slots.
pub trait SlotBackend {
    /// Read a slot, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<Slot>>;

    /// Replace a slot if its version still equals `expected_version`.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotConflict`] if another writer got there first, or
    /// an error if the backend cannot be written.
    fn write(&self, key: &str, value: &str, expected_version: u64) -> Result<u64>;
}

/// Ordered, append-only record collection over a [`SlotBackend`].
#[derive(Debug)]
pub struct RecordStore<B> {
    backend: B,
    key: String,
    max_attempts: u32,
}

impl<B: SlotBackend> RecordStore<B> {
    /// Create a store over `backend` using the slot `key`.
    #[must_use]
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set how many times an append is attempted when writers conflict.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// The slot key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read every stored record in insertion order.
    ///
    /// An absent or blank slot reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptSlot`] if the slot holds something other than
    /// a record list, or an error if the backend fails.
    pub fn load(&self) -> Result<Vec<Record>> {
        self.read_records().map(|(records, _)| records)
    }

    fn read_records(&self) -> Result<(Vec<Record>, u64)> {
        let Some(slot) = self.backend.read(&self.key)? else {
            trace!(key = %self.key, "Slot absent, starting empty");
            return Ok((Vec::new(), 0));
        };

        if slot.value.trim().is_empty() {
            return Ok((Vec::new(), slot.version));
        }

        let records =
            serde_json::from_str(&slot.value).map_err(|source| Error::CorruptSlot {
                key: self.key.clone(),
                source,
            })?;
        Ok((records, slot.version))
    }

    /// Append a registration, stamping its id and initial status.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unreadable, the backend fails, or
    /// every attempt lost a race with another writer.
    pub fn append(&self, registration: Registration) -> Result<Record> {
        for attempt in 1..=self.max_attempts {
            let (mut records, version) = self.read_records()?;

            let id = next_id(Utc::now().timestamp_millis(), &records);
            let record = registration.clone().into_record(id);
            records.push(record.clone());

            let value = serde_json::to_string(&records)?;
            match self.backend.write(&self.key, &value, version) {
                Ok(new_version) => {
                    debug!(
                        key = %self.key,
                        id,
                        version = new_version,
                        total = records.len(),
                        "Appended record"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_conflict() => {
                    warn!(key = %self.key, attempt, "Slot changed while appending, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::AppendRetriesExhausted {
            key: self.key.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Summarize the stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be loaded.
    pub fn stats(&self) -> Result<RecordStats> {
        Ok(RecordStats::from_records(&self.load()?))
    }
}

/// Next unique id: the current time, or one past the largest stored id.
fn next_id(now_ms: i64, records: &[Record]) -> i64 {
    records
        .iter()
        .map(|r| r.id)
        .max()
        .map_or(now_ms, |max| now_ms.max(max.saturating_add(1)))
}

/// Totals over a record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RecordStats {
    /// All records.
    pub total: usize,
    /// Records with the donor role.
    pub donors: usize,
    /// Records with the recipient role.
    pub recipients: usize,
    /// Donors still pending.
    pub pending_donors: usize,
    /// Recipients still pending.
    pub pending_recipients: usize,
    /// Units offered by pending donors.
    pub units_offered: u64,
    /// Units requested by pending recipients.
    pub units_requested: u64,
}

impl RecordStats {
    /// Compute totals over `records`.
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        records.iter().fold(Self::default(), |mut stats, r| {
            stats.total += 1;
            let pending = r.status == Status::Pending;
            match r.role {
                Role::Donor => {
                    stats.donors += 1;
                    if pending {
                        stats.pending_donors += 1;
                        stats.units_offered += u64::from(r.quantity);
                    }
                }
                Role::Recipient => {
                    stats.recipients += 1;
                    if pending {
                        stats.pending_recipients += 1;
                        stats.units_requested += u64::from(r.quantity);
                    }
                }
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::form::FormData;

    fn registration(role: &str, name: &str, quantity: &str) -> Registration {
        FormData::new()
            .with("userType", role)
            .with("name", name)
            .with("medicine", "Metformin 500mg")
            .with("quantity", quantity)
            .to_registration()
    }

    fn create_test_store() -> RecordStore<MemoryBackend> {
        RecordStore::new(MemoryBackend::new(), DEFAULT_SLOT_KEY)
    }

    /// Backend that lets another writer sneak in before each of our writes.
    #[derive(Debug)]
    struct Interfering {
        inner: MemoryBackend,
        interruptions: Cell<u32>,
    }

    impl SlotBackend for Interfering {
        fn read(&self, key: &str) -> Result<Option<Slot>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str, expected_version: u64) -> Result<u64> {
            if self.interruptions.get() > 0 {
                self.interruptions.set(self.interruptions.get() - 1);
                let current = self.inner.read(key)?.map_or(0, |s| s.version);
                self.inner.write(key, "[]", current)?;
            }
            self.inner.write(key, value, expected_version)
        }
    }

    #[test]
    fn test_load_absent_slot_is_empty() {
        let store = create_test_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_blank_slot_is_empty() {
        let backend = MemoryBackend::new();
        backend.write(DEFAULT_SLOT_KEY, "  ", 0).unwrap();
        let store = RecordStore::new(backend, DEFAULT_SLOT_KEY);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_slot_is_an_error() {
        let backend = MemoryBackend::new();
        backend.write(DEFAULT_SLOT_KEY, "{oops", 0).unwrap();
        let store = RecordStore::new(backend, DEFAULT_SLOT_KEY);

        assert!(store.load().unwrap_err().is_corrupt());
        let err = store
            .append(registration("donor", "Alice", "1"))
            .unwrap_err();
        assert!(err.is_corrupt());

        // The unreadable value is left alone.
        let slot = store.backend().read(DEFAULT_SLOT_KEY).unwrap().unwrap();
        assert_eq!(slot.value, "{oops");
    }

    #[test]
    fn test_append_round_trip() {
        let store = create_test_store();
        let names = ["Ann", "Ben", "Cal", "Dee", "Eve"];
        for (i, name) in names.iter().enumerate() {
            let role = if i % 2 == 0 { "donor" } else { "recipient" };
            store
                .append(registration(role, name, &i.to_string()))
                .unwrap();
        }

        let records = store.load().unwrap();
        assert_eq!(records.len(), names.len());
        for (i, (record, name)) in records.iter().zip(names).enumerate() {
            assert_eq!(record.name, name);
            assert_eq!(record.quantity, u32::try_from(i).unwrap());
            assert_eq!(record.medicine, "Metformin 500mg");
            assert_eq!(record.status, Status::Pending);
        }
    }

    #[test]
    fn test_append_ids_strictly_increase() {
        let store = create_test_store();
        let ids: Vec<i64> = (0..4)
            .map(|_| store.append(registration("donor", "A", "1")).unwrap().id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(100, &[]), 100);

        let mut record = registration("donor", "A", "1").into_record(500);
        assert_eq!(next_id(100, std::slice::from_ref(&record)), 501);

        record.id = 50;
        assert_eq!(next_id(100, &[record]), 100);
    }

    #[test]
    fn test_append_retries_on_conflict() {
        let backend = Interfering {
            inner: MemoryBackend::new(),
            interruptions: Cell::new(2),
        };
        let store = RecordStore::new(backend, DEFAULT_SLOT_KEY).with_max_attempts(3);

        let record = store.append(registration("donor", "Alice", "4")).unwrap();
        assert_eq!(store.load().unwrap(), vec![record]);
    }

    #[test]
    fn test_append_gives_up_after_max_attempts() {
        let backend = Interfering {
            inner: MemoryBackend::new(),
            interruptions: Cell::new(10),
        };
        let store = RecordStore::new(backend, DEFAULT_SLOT_KEY).with_max_attempts(2);

        let err = store
            .append(registration("donor", "Alice", "4"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AppendRetriesExhausted { attempts: 2, .. }
        ));
    }

    #[test]
    fn test_with_max_attempts_at_least_one() {
        let store = create_test_store().with_max_attempts(0);
        assert!(store.append(registration("donor", "A", "1")).is_ok());
    }

    #[test]
    fn test_stats() {
        let store = create_test_store();
        store.append(registration("donor", "A", "10")).unwrap();
        store.append(registration("donor", "B", "5")).unwrap();
        store.append(registration("recipient", "C", "3")).unwrap();
        store.append(registration("", "D", "2")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.donors, 2);
        assert_eq!(stats.recipients, 2);
        assert_eq!(stats.pending_donors, 2);
        assert_eq!(stats.pending_recipients, 2);
        assert_eq!(stats.units_offered, 15);
        assert_eq!(stats.units_requested, 5);
    }

    #[test]
    fn test_stats_skip_non_pending_units() {
        let mut done = registration("donor", "A", "10").into_record(1);
        done.status = Status::Completed;
        let stats = RecordStats::from_records(&[done]);
        assert_eq!(stats.donors, 1);
        assert_eq!(stats.pending_donors, 0);
        assert_eq!(stats.units_offered, 0);
    }
}
