//! The normalized departure record.

use serde::Serialize;

use super::VehicleRecord;

/// A display-ready departure, recomputed on every refresh cycle.
///
/// Produced by [`crate::normalize::normalize`] from one raw upstream
/// record plus a vehicle directory lookup. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Departure {
    /// Route short name, e.g. "6" or "N5". "?" when absent upstream.
    pub route: String,
    /// Destination headsign. "?" when absent upstream.
    pub headsign: String,
    /// Whole minutes until the estimated departure, truncated toward
    /// zero. `-1` when the estimated time could not be parsed.
    pub minutes: i64,
    /// Delay in minutes, rounded to one decimal place. Missing delay
    /// counts as 0.
    pub delay: f64,
    /// Local wall-clock departure time ("HH:MM"), or "?" when the
    /// estimated time could not be parsed.
    pub time: String,
    /// Local scheduled time ("HH:MM"); absent when the theoretical time
    /// was missing or unparseable.
    pub scheduled_time: Option<String>,
    /// Raw estimated timestamp as received upstream.
    pub estimated_time: String,
    /// Raw theoretical timestamp as received upstream.
    pub theoretical_time: String,
    /// True exactly when the upstream status was the literal "REALTIME".
    pub is_realtime: bool,
    pub vehicle_code: Option<String>,
    /// Equipment of the serving vehicle; defaults when unknown.
    pub vehicle: VehicleRecord,
    /// Concatenated equipment icon glyphs, fixed order.
    pub icons: String,
    /// Human-readable one-line summary rendered from the configured
    /// format template.
    pub summary: String,
}
