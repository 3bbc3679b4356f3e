//! Core record types for medswap.
//!
//! This module defines the registration record persisted by the store and
//! the lenient coercions that turn raw form text into typed fields.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Role assigned when a submission does not name one.
pub const DEFAULT_ROLE: Role = Role::Recipient;

/// Keys a serialized [`Record`] writes itself. Extra fields never use them.
pub const FIELD_NAMES: &[&str] = &[
    "id", "type", "name", "contact", "medicine", "quantity", "expiry", "urgency", "latitude",
    "longitude", "status",
];

static INT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+").expect("static regex"));

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("static regex")
});

/// Whether a record offers medicine or asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Offers medicine.
    Donor,
    /// Needs medicine.
    Recipient,
}

impl Role {
    /// Resolve a submitted role value, falling back to [`DEFAULT_ROLE`].
    #[must_use]
    pub fn from_field(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("donor") => Self::Donor,
            Some(v) if v.eq_ignore_ascii_case("recipient") => Self::Recipient,
            _ => DEFAULT_ROLE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Donor => write!(f, "donor"),
            Self::Recipient => write!(f, "recipient"),
        }
    }
}

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Newly registered.
    #[default]
    Pending,
    /// A recipient whose need was covered.
    Matched,
    /// A donor whose stock was handed out.
    Completed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Matched => write!(f, "MATCHED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// One donor or recipient registration.
///
/// Serialized as a flat JSON object. Form fields that have no dedicated slot
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Creation time in milliseconds since the Unix epoch, unique per store.
    pub id: i64,

    /// Donor or recipient.
    #[serde(rename = "type", default = "default_role")]
    pub role: Role,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Phone number, email or similar.
    #[serde(default)]
    pub contact: String,

    /// Medicine offered or needed.
    #[serde(default)]
    pub medicine: String,

    /// Units offered or needed.
    #[serde(default, deserialize_with = "lenient::quantity")]
    pub quantity: u32,

    /// Expiry of the offered stock as submitted (donors only).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::text"
    )]
    pub expiry: Option<String>,

    /// How urgent the need is, as submitted (recipients only).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::text"
    )]
    pub urgency: Option<String>,

    /// Latitude in degrees, 0 when unknown.
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub latitude: f64,

    /// Longitude in degrees, 0 when unknown.
    #[serde(default, deserialize_with = "lenient::coordinate")]
    pub longitude: f64,

    /// Lifecycle status.
    #[serde(default)]
    pub status: Status,

    /// Any other submitted fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

const fn default_role() -> Role {
    DEFAULT_ROLE
}

impl Record {
    /// First character of the trimmed name, uppercased, or `?`.
    #[must_use]
    pub fn avatar(&self) -> String {
        self.name
            .trim()
            .chars()
            .next()
            .map_or_else(|| "?".to_string(), |c| c.to_uppercase().collect())
    }

    /// Whether both coordinates carry a usable non-zero value.
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.latitude != 0.0
            && self.longitude != 0.0
            && self.latitude.is_finite()
            && self.longitude.is_finite()
    }

    /// Coordinate pair formatted with `precision` decimals, empty without a location.
    #[must_use]
    pub fn location_label(&self, precision: usize) -> String {
        if self.has_location() {
            format!(
                "{:.precision$}°, {:.precision$}°",
                self.latitude, self.longitude
            )
        } else {
            String::new()
        }
    }

    /// The role-specific column: expiry for donors, urgency for recipients.
    #[must_use]
    pub fn role_detail(&self) -> String {
        let detail = match self.role {
            Role::Donor => self.expiry.as_deref(),
            Role::Recipient => self.urgency.as_deref(),
        };
        detail.unwrap_or_default().to_string()
    }
}

/// Parse the leading integer of `input`, ignoring leading whitespace.
///
/// `"12abc"` yields 12; input without leading digits yields `None`.
#[must_use]
pub fn parse_int_prefix(input: &str) -> Option<i64> {
    INT_PREFIX
        .find(input.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse the leading decimal number of `input`, ignoring leading whitespace.
#[must_use]
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    FLOAT_PREFIX
        .find(input.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

/// Coerce quantity input. Missing, invalid or negative input becomes 0.
#[must_use]
pub fn coerce_quantity(input: &str) -> u32 {
    parse_int_prefix(input).map_or(0, |n| {
        if n <= 0 {
            0
        } else {
            u32::try_from(n).unwrap_or(u32::MAX)
        }
    })
}

/// Coerce a coordinate. Invalid or non-finite input becomes 0.
#[must_use]
pub fn coerce_coordinate(input: &str) -> f64 {
    parse_float_prefix(input)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Deserializers that accept what older writers stored: numbers as strings,
/// strings as numbers, and `null` for unparsable numbers.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_text(value: Option<Value>) -> Option<String> {
        match value? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn quantity<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(as_text(value).map_or(0, |s| super::coerce_quantity(&s)))
    }

    pub fn coordinate<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
            other => as_text(other).map_or(0.0, |s| super::coerce_coordinate(&s)),
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(as_text(value))
    }
}
