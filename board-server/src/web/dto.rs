//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::config::{BoardOptions, ConfigError};
use crate::coordinator::Snapshot;

/// Setup form submission. Every field arrives as text; numeric fields are
/// parsed here so the form can report which one was malformed.
#[derive(Debug, Default, Deserialize)]
pub struct SetupForm {
    /// Stop id list; comma, space, or newline separated.
    pub stops: String,

    /// Poll interval in seconds (blank for the default).
    #[serde(default)]
    pub scan_interval: String,

    /// Departures to display per stop (blank for the default).
    #[serde(default)]
    pub max_departures: String,

    #[serde(default)]
    pub icon_wheelchair: String,
    #[serde(default)]
    pub icon_bike: String,
    #[serde(default)]
    pub icon_low_floor: String,
    #[serde(default)]
    pub icon_air_conditioning: String,
    #[serde(default)]
    pub icon_usb: String,
    #[serde(default)]
    pub icon_kneeling: String,

    /// Summary template (blank for the default).
    #[serde(default)]
    pub departure_format: String,
}

impl SetupForm {
    /// Convert the text fields into validatable options.
    pub fn into_options(self) -> Result<BoardOptions, ConfigError> {
        let scan_interval = parse_optional(&self.scan_interval, "scan interval")?;
        let max_departures = parse_optional(&self.max_departures, "max departures")?;

        Ok(BoardOptions {
            stops: self.stops,
            scan_interval,
            max_departures,
            icon_wheelchair: non_empty(self.icon_wheelchair),
            icon_bike: non_empty(self.icon_bike),
            icon_low_floor: non_empty(self.icon_low_floor),
            icon_air_conditioning: non_empty(self.icon_air_conditioning),
            icon_usb: non_empty(self.icon_usb),
            icon_kneeling: non_empty(self.icon_kneeling),
            departure_format: non_empty(self.departure_format),
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
) -> Result<Option<T>, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { field })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One board in the `/api/boards` response.
#[derive(Debug, Serialize)]
pub struct BoardStatus {
    /// Configured stop ids, in display order.
    pub stop_ids: Vec<String>,

    /// Latest snapshot, absent until the first successful cycle.
    pub snapshot: Option<Snapshot>,

    /// Message of the last failed cycle, cleared on success.
    pub last_error: Option<String>,
}

/// Error payload for all API errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
