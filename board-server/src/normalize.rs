//! Departure normalization.
//!
//! Converts one raw upstream departure plus a vehicle directory lookup
//! into a display-ready [`Departure`]: parsed times, truncated minutes,
//! equipment icons, and a templated one-line summary. Pure except for the
//! injected clock, so every edge case is unit-testable.

use chrono::{DateTime, Local, Utc};
use tracing::debug;

use crate::domain::{Departure, VehicleRecord};
use crate::ztm::RawDeparture;

/// Default one-line summary template.
pub const DEFAULT_FORMAT: &str = "{route} → {headsign} | {time} ({minutes} min)";

/// Icon glyphs for vehicle equipment, each overridable by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
    pub wheelchair: String,
    pub bike: String,
    pub low_floor: String,
    pub air_conditioning: String,
    pub usb: String,
    pub kneeling: String,
}

impl Default for IconSet {
    fn default() -> Self {
        Self {
            wheelchair: "♿".to_string(),
            bike: "🚴".to_string(),
            low_floor: "🔽".to_string(),
            air_conditioning: "❄️".to_string(),
            usb: "🔌".to_string(),
            kneeling: "⬇️".to_string(),
        }
    }
}

/// Concatenate the icon glyphs for every present piece of equipment.
///
/// Order is fixed: wheelchair, bike, low floor, air conditioning, USB,
/// kneeling.
pub fn equipment_icons(vehicle: &VehicleRecord, icons: &IconSet) -> String {
    let mut out = String::new();
    if vehicle.wheelchair_accessible {
        out.push_str(&icons.wheelchair);
    }
    if vehicle.bike_holders > 0 {
        out.push_str(&icons.bike);
    }
    if vehicle.low_floor {
        out.push_str(&icons.low_floor);
    }
    if vehicle.air_conditioning {
        out.push_str(&icons.air_conditioning);
    }
    if vehicle.usb_chargers {
        out.push_str(&icons.usb);
    }
    if vehicle.kneeling_mechanism {
        out.push_str(&icons.kneeling);
    }
    out
}

/// Error from rendering a summary template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder: {0}")]
    UnknownPlaceholder(String),
    #[error("unclosed placeholder")]
    Unclosed,
    #[error("unmatched closing brace")]
    UnmatchedBrace,
}

/// Substitute `{name}` placeholders. `{{` and `}}` escape literal braces.
fn render_template(
    template: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(TemplateError::Unclosed),
                    }
                }
                match lookup(&name) {
                    Some(value) => out.push_str(&value),
                    None => return Err(TemplateError::UnknownPlaceholder(name)),
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::UnmatchedBrace);
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Parse an upstream ISO 8601 timestamp. A trailing `Z` counts as the
/// `+00:00` offset; anything unparseable is `None`.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Local wall-clock rendering of a timestamp.
fn local_hhmm(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%H:%M").to_string()
}

/// Normalize one raw departure.
///
/// `vehicle` is the directory lookup result for the departure's vehicle
/// code; `now` is the reference clock for the minutes-until computation.
/// Never fails: unparseable times become sentinels, and a broken summary
/// template falls back to a hardcoded form.
pub fn normalize(
    raw: &RawDeparture,
    vehicle: VehicleRecord,
    now: DateTime<Utc>,
    icons: &IconSet,
    format: &str,
) -> Departure {
    let route = raw
        .route_short_name
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "?".to_string());
    let headsign = raw
        .headsign
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "?".to_string());

    let estimated_time = raw.estimated_time.clone().unwrap_or_default();
    let theoretical_time = raw.theoretical_time.clone().unwrap_or_default();

    // Minutes truncate toward zero; -1 marks an unparseable estimate.
    let (minutes, time) = match parse_timestamp(&estimated_time) {
        Some(dt) => ((dt - now).num_seconds() / 60, local_hhmm(dt)),
        None => (-1, "?".to_string()),
    };

    let scheduled_time = parse_timestamp(&theoretical_time).map(local_hhmm);

    let delay_seconds = raw.delay_in_seconds.unwrap_or(0);
    let delay = (delay_seconds as f64 / 60.0 * 10.0).round() / 10.0;

    let is_realtime = raw.status.as_deref() == Some("REALTIME");

    let vehicle_code = raw.vehicle_code.as_ref().map(|c| c.as_str().to_string());
    let icons_str = equipment_icons(&vehicle, icons);

    let lookup = |name: &str| -> Option<String> {
        match name {
            "route" => Some(route.clone()),
            "headsign" => Some(headsign.clone()),
            "time" => Some(time.clone()),
            "scheduled_time" => Some(scheduled_time.clone().unwrap_or_default()),
            "minutes" => Some(minutes.to_string()),
            "delay" => Some(delay.to_string()),
            "vehicle_code" => Some(vehicle_code.clone().unwrap_or_default()),
            "vehicle_properties_icons" => Some(icons_str.clone()),
            "realtime" => Some(is_realtime.to_string()),
            _ => None,
        }
    };

    let summary = match render_template(format, &lookup) {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, "departure format failed; using fallback summary");
            format!("{route} → {headsign} | {time}")
        }
    };

    Departure {
        route,
        headsign,
        minutes,
        delay,
        time,
        scheduled_time,
        estimated_time,
        theoretical_time,
        is_realtime,
        vehicle_code,
        vehicle,
        icons: icons_str,
        summary,
    }
}
