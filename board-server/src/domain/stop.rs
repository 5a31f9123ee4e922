//! Stop identifier and stop metadata types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid stop id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// A validated ZTM stop identifier.
///
/// Upstream documents carry stop ids sometimes as JSON numbers and
/// sometimes as strings. All caches in this crate are keyed by this type,
/// which stores the canonical decimal string form, so an id can never be
/// present under one spelling and missed under the other.
///
/// # Examples
///
/// ```
/// use board_server::domain::StopId;
///
/// let id = StopId::parse("14562").unwrap();
/// assert_eq!(id.as_str(), "14562");
/// assert_eq!(id, StopId::from_number(14562));
///
/// // Non-digit input is rejected
/// assert!(StopId::parse("14562a").is_err());
/// assert!(StopId::parse("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    /// Parse a stop id from a string.
    ///
    /// The input must be a non-empty sequence of ASCII digits.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        if s.is_empty() {
            return Err(InvalidStopId {
                reason: "must not be empty",
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidStopId {
                reason: "must contain only ASCII digits",
            });
        }
        Ok(StopId(s.to_string()))
    }

    /// Build a stop id from the numeric form used by some upstream fields.
    pub fn from_number(n: i64) -> Self {
        StopId(n.to_string())
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport type served by a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportKind {
    Bus,
    Tram,
}

impl Default for TransportKind {
    fn default() -> Self {
        TransportKind::Bus
    }
}

/// Static metadata for a stop, as held by the stop directory.
///
/// Immutable once created; the directory only ever bulk-clears entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRecord {
    /// Full display name, e.g. "Brama Wyżynna 01".
    pub name: String,
    /// Name without the platform suffix.
    pub short_name: String,
    /// Platform / sub-name, zero-padded when numeric ("1" becomes "01").
    pub platform: String,
    /// Fare zone label.
    pub zone: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub kind: TransportKind,
    pub wheelchair_accessible: bool,
    pub on_demand: bool,
    pub zone_border: bool,
    /// True for synthetic entries created when no source knew the stop.
    pub is_fallback: bool,
}

impl StopRecord {
    /// Synthetic record for a stop id no source could resolve.
    pub fn fallback(id: &StopId) -> Self {
        let name = format!("Stop {id}");
        StopRecord {
            short_name: name.clone(),
            name,
            platform: String::new(),
            zone: String::new(),
            lat: None,
            lon: None,
            kind: TransportKind::Bus,
            wheelchair_accessible: false,
            on_demand: false,
            zone_border: false,
            is_fallback: true,
        }
    }
}
