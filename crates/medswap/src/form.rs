//! Registration form handling.
//!
//! Turns the flat list of submitted form fields into a [`Registration`],
//! decides which role-specific field group is shown, and drives a
//! submission through a [`RecordStore`](crate::storage::RecordStore).

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::Result;
use crate::record::{coerce_coordinate, coerce_quantity, Record, Role, Status, FIELD_NAMES};
use crate::storage::{RecordStore, SlotBackend};

/// Message shown after a successful submission.
pub const SUCCESS_MESSAGE: &str = "Registration saved locally. Open Users to view.";

/// Form field names with a dedicated meaning.
pub mod fields {
    /// Role radio group.
    pub const ROLE: &str = "userType";
    /// Display name.
    pub const NAME: &str = "name";
    /// Contact details.
    pub const CONTACT: &str = "contact";
    /// Medicine name.
    pub const MEDICINE: &str = "medicine";
    /// Units.
    pub const QUANTITY: &str = "quantity";
    /// Donor expiry date.
    pub const EXPIRY: &str = "expiry";
    /// Recipient urgency.
    pub const URGENCY: &str = "urgency";
    /// Latitude.
    pub const LATITUDE: &str = "latitude";
    /// Longitude.
    pub const LONGITUDE: &str = "longitude";

    /// Fields consumed into typed record fields.
    pub const KNOWN: &[&str] = &[
        ROLE, NAME, CONTACT, MEDICINE, QUANTITY, EXPIRY, URGENCY, LATITUDE, LONGITUDE,
    ];
}

/// Which role-specific field group is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldVisibility {
    /// Neither group (no role selected).
    #[default]
    Hidden,
    /// Only the donor group.
    Donor,
    /// Only the recipient group.
    Recipient,
}

impl FieldVisibility {
    /// Evaluate the radio state. The donor radio is checked first.
    #[must_use]
    pub const fn from_radios(donor_checked: bool, recipient_checked: bool) -> Self {
        if donor_checked {
            Self::Donor
        } else if recipient_checked {
            Self::Recipient
        } else {
            Self::Hidden
        }
    }

    /// Visibility for an already-resolved selection.
    #[must_use]
    pub const fn for_selection(role: Option<Role>) -> Self {
        match role {
            Some(Role::Donor) => Self::Donor,
            Some(Role::Recipient) => Self::Recipient,
            None => Self::Hidden,
        }
    }

    /// Whether the donor group is shown.
    #[must_use]
    pub const fn shows_donor_fields(self) -> bool {
        matches!(self, Self::Donor)
    }

    /// Whether the recipient group is shown.
    #[must_use]
    pub const fn shows_recipient_fields(self) -> bool {
        matches!(self, Self::Recipient)
    }
}

/// Named form fields in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Add a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Value of a field. When a name repeats, the last value wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of submitted entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build a registration from the submitted fields.
    #[must_use]
    pub fn to_registration(&self) -> Registration {
        let role = Role::from_field(self.get(fields::ROLE));
        let text = |name| self.get(name).unwrap_or_default().to_string();

        let extra = self
            .iter()
            .filter(|(k, _)| !fields::KNOWN.contains(k) && !FIELD_NAMES.contains(k))
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();

        Registration {
            role,
            name: text(fields::NAME),
            contact: text(fields::CONTACT),
            medicine: text(fields::MEDICINE),
            quantity: coerce_quantity(self.get(fields::QUANTITY).unwrap_or_default()),
            expiry: match role {
                Role::Donor => self.get(fields::EXPIRY).map(str::to_string),
                Role::Recipient => None,
            },
            urgency: match role {
                Role::Recipient => self.get(fields::URGENCY).map(str::to_string),
                Role::Donor => None,
            },
            latitude: coerce_coordinate(self.get(fields::LATITUDE).unwrap_or_default()),
            longitude: coerce_coordinate(self.get(fields::LONGITUDE).unwrap_or_default()),
            extra,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A coerced submission waiting for an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Resolved role.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Contact details.
    pub contact: String,
    /// Medicine name.
    pub medicine: String,
    /// Units.
    pub quantity: u32,
    /// Donor expiry, as submitted.
    pub expiry: Option<String>,
    /// Recipient urgency, as submitted.
    pub urgency: Option<String>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Fields without a dedicated slot.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Registration {
    /// Stamp the registration with its id and initial status.
    ///
    /// Extra entries named like a record field are dropped; the record's own
    /// value wins.
    #[must_use]
    pub fn into_record(mut self, id: i64) -> Record {
        self.extra.retain(|key, _| !FIELD_NAMES.contains(&key.as_str()));
        Record {
            id,
            role: self.role,
            name: self.name,
            contact: self.contact,
            medicine: self.medicine,
            quantity: self.quantity,
            expiry: self.expiry,
            urgency: self.urgency,
            latitude: self.latitude,
            longitude: self.longitude,
            status: Status::Pending,
            extra: self.extra,
        }
    }
}

/// Outcome of a form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The record as stored.
    pub record: Record,
    /// User-facing confirmation.
    pub message: &'static str,
    /// Field visibility after the form was reset.
    pub visibility: FieldVisibility,
}

/// Submit a form: coerce, append to the store, and reset.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn submit<B: SlotBackend>(store: &RecordStore<B>, form: &FormData) -> Result<Submission> {
    let registration = form.to_registration();
    debug!(
        role = %registration.role,
        fields = form.len(),
        "Submitting registration"
    );

    let record = store.append(registration)?;
    info!(id = record.id, role = %record.role, "Registration saved");

    Ok(Submission {
        record,
        message: SUCCESS_MESSAGE,
        visibility: FieldVisibility::for_selection(None),
    })
}
