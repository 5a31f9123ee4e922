//! Board configuration.
//!
//! Parses the free-text setup input (stop ids, poll interval, display
//! limit, icon overrides) and validates the stop ids against the stop
//! datasets, falling back to a live departures probe when no dataset can
//! be loaded. A configuration with zero valid stops is rejected.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::StopId;
use crate::normalize::{DEFAULT_FORMAT, IconSet};
use crate::ztm::TransitApi;

/// Bounds for the poll interval, seconds.
pub const MIN_SCAN_INTERVAL: u64 = 10;
pub const MAX_SCAN_INTERVAL: u64 = 300;
pub const DEFAULT_SCAN_INTERVAL: u64 = 30;

/// Bounds for the departures-to-display limit.
pub const MIN_MAX_DEPARTURES: usize = 1;
pub const MAX_MAX_DEPARTURES: usize = 20;
pub const DEFAULT_MAX_DEPARTURES: usize = 5;

/// Raw, unvalidated configuration input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardOptions {
    /// Free-text stop id list; comma, space, or newline separated.
    pub stops: String,
    pub scan_interval: Option<u64>,
    pub max_departures: Option<usize>,
    pub icon_wheelchair: Option<String>,
    pub icon_bike: Option<String>,
    pub icon_low_floor: Option<String>,
    pub icon_air_conditioning: Option<String>,
    pub icon_usb: Option<String>,
    pub icon_kneeling: Option<String>,
    pub departure_format: Option<String>,
}

/// Validated configuration for one board.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub stop_ids: Vec<StopId>,
    pub scan_interval: Duration,
    pub max_departures: usize,
    pub icons: IconSet,
    pub format: String,
}

/// Configuration validation failure, surfaced synchronously to the setup
/// form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no stop ids given")]
    NoStops,

    #[error("scan interval must be between 10 and 300 seconds, got {0}")]
    IntervalOutOfRange(u64),

    #[error("max departures must be between 1 and 20, got {0}")]
    MaxDeparturesOutOfRange(usize),

    #[error("none of the given stop ids could be validated")]
    NoValidStops,

    #[error("{field} must be a number")]
    InvalidNumber { field: &'static str },
}

/// Parse the free-text stop list. Tokens may be separated by commas,
/// spaces, or newlines; only digit-only tokens survive.
pub fn parse_stop_input(input: &str) -> Vec<StopId> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|token| StopId::parse(token.trim()).ok())
        .collect()
}

/// Validate raw options into a [`BoardConfig`].
///
/// Stop ids are checked against the first stop dataset that loads; when
/// none loads, each id is probed against the live departures feed
/// instead.
pub async fn validate_options(
    options: &BoardOptions,
    api: &dyn TransitApi,
) -> Result<BoardConfig, ConfigError> {
    let stop_ids = parse_stop_input(&options.stops);
    if stop_ids.is_empty() {
        return Err(ConfigError::NoStops);
    }

    let scan_interval = options.scan_interval.unwrap_or(DEFAULT_SCAN_INTERVAL);
    if !(MIN_SCAN_INTERVAL..=MAX_SCAN_INTERVAL).contains(&scan_interval) {
        return Err(ConfigError::IntervalOutOfRange(scan_interval));
    }

    let max_departures = options.max_departures.unwrap_or(DEFAULT_MAX_DEPARTURES);
    if !(MIN_MAX_DEPARTURES..=MAX_MAX_DEPARTURES).contains(&max_departures) {
        return Err(ConfigError::MaxDeparturesOutOfRange(max_departures));
    }

    let valid = validate_stop_ids(&stop_ids, api).await;
    if valid.is_empty() {
        return Err(ConfigError::NoValidStops);
    }
    if valid.len() < stop_ids.len() {
        warn!(
            valid = valid.len(),
            requested = stop_ids.len(),
            "some stop ids could not be validated"
        );
    }

    Ok(BoardConfig {
        stop_ids: valid,
        scan_interval: Duration::from_secs(scan_interval),
        max_departures,
        icons: icon_set(options),
        format: options
            .departure_format
            .clone()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
    })
}

/// Check the requested ids against a stop dataset, or probe the
/// departures feed per id when no dataset loads.
async fn validate_stop_ids(stop_ids: &[StopId], api: &dyn TransitApi) -> Vec<StopId> {
    for source in api.stop_sources() {
        match api.stop_dataset(&source).await {
            Ok(entries) if !entries.is_empty() => {
                let known: HashSet<StopId> = entries
                    .iter()
                    .filter_map(|e| e.stop_id.map(StopId::from_number))
                    .collect();
                info!(
                    source = %source.label,
                    known = known.len(),
                    "validating stop ids against dataset"
                );
                return stop_ids
                    .iter()
                    .filter(|id| {
                        let ok = known.contains(id);
                        if !ok {
                            warn!(stop = %id, "stop id not found in dataset");
                        }
                        ok
                    })
                    .cloned()
                    .collect();
            }
            Ok(_) => debug!(source = %source.label, "empty dataset, trying next source"),
            Err(e) => debug!(source = %source.label, error = %e, "dataset unavailable"),
        }
    }

    // No dataset loaded: probe each id against the live departures feed.
    info!("no stop dataset available, validating via departures probe");
    let mut valid = Vec::new();
    for id in stop_ids {
        match api.departures(id).await {
            Ok(_) => valid.push(id.clone()),
            Err(e) => warn!(stop = %id, error = %e, "stop id failed departures probe"),
        }
    }
    valid
}

/// Default icon set with the configured overrides applied. Empty
/// overrides are ignored.
fn icon_set(options: &BoardOptions) -> IconSet {
    let mut icons = IconSet::default();
    let overrides = [
        (&options.icon_wheelchair, &mut icons.wheelchair),
        (&options.icon_bike, &mut icons.bike),
        (&options.icon_low_floor, &mut icons.low_floor),
        (&options.icon_air_conditioning, &mut icons.air_conditioning),
        (&options.icon_usb, &mut icons.usb),
        (&options.icon_kneeling, &mut icons.kneeling),
    ];
    for (value, slot) in overrides {
        if let Some(v) = value {
            if !v.trim().is_empty() {
                *slot = v.trim().to_string();
            }
        }
    }
    icons
}
