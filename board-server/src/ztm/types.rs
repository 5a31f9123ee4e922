//! ZTM open-data response DTOs.
//!
//! These types map to the three upstream JSON feeds. Every field is
//! optional at the wire level because the feeds omit fields, send nulls,
//! and deliver several fields interchangeably as numbers or strings.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::VehicleCode;

use super::error::ZtmError;

/// Deserialize an optional field that may arrive as a string or a number.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserialize an optional vehicle code that may arrive as a number,
/// a string, or null. Unusable values degrade to `None` rather than
/// failing the whole record.
fn opt_vehicle_code<'de, D>(deserializer: D) -> Result<Option<VehicleCode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().map(VehicleCode::from_number),
        Some(Value::String(s)) => VehicleCode::parse(&s).ok(),
        _ => None,
    })
}

/// Deserialize an optional integer id that may arrive as a number or a
/// numeric string.
fn opt_int_like<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// One raw departure as delivered by the departures feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDeparture {
    #[serde(deserialize_with = "opt_string_or_number")]
    pub route_short_name: Option<String>,
    pub headsign: Option<String>,
    /// Scheduled timestamp, ISO 8601.
    pub theoretical_time: Option<String>,
    /// Realtime-estimated timestamp, ISO 8601.
    pub estimated_time: Option<String>,
    pub delay_in_seconds: Option<i64>,
    /// "REALTIME" for live estimates; anything else means scheduled data.
    pub status: Option<String>,
    #[serde(deserialize_with = "opt_vehicle_code")]
    pub vehicle_code: Option<VehicleCode>,
    /// Per-event timestamp.
    pub timestamp: Option<String>,
}

/// Wrapper for the departures response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeparturesResponse {
    #[serde(default)]
    pub departures: Vec<RawDeparture>,
}

/// One stop entry from a stop-dataset document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopEntry {
    #[serde(deserialize_with = "opt_int_like")]
    pub stop_id: Option<i64>,
    /// Display name from the traffic-management system.
    pub stop_desc: Option<String>,
    /// Display name from the schedule system.
    pub stop_name: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub stop_short_name: Option<String>,
    pub name: Option<String>,
    /// Usually the platform number, e.g. "01".
    #[serde(deserialize_with = "opt_string_or_number")]
    pub sub_name: Option<String>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub platform: Option<String>,
    pub zone_name: Option<String>,
    pub zone: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    /// Transport type; `2` in the numeric datasets, `"TRAM"`/`"BUS"` in
    /// the string-typed ones.
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub wheelchair_boarding: Option<i64>,
    pub on_demand: Option<i64>,
    pub ticket_zone_border: Option<i64>,
}

impl StopEntry {
    /// Display name: the first non-empty of the candidate fields, in
    /// preference order.
    pub fn display_name(&self) -> Option<&str> {
        [
            self.stop_desc.as_deref(),
            self.stop_name.as_deref(),
            self.stop_short_name.as_deref(),
            self.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }

    /// Whether the `type` field marks this stop as a tram stop, under
    /// either of the two shapes the datasets use.
    pub fn is_tram(&self) -> bool {
        match &self.kind {
            Some(Value::Number(n)) => n.as_i64() == Some(2),
            Some(Value::String(s)) => s.eq_ignore_ascii_case("tram"),
            _ => false,
        }
    }
}

/// One vehicle entry from the vehicle database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleEntry {
    #[serde(deserialize_with = "opt_vehicle_code")]
    pub vehicle_code: Option<VehicleCode>,
    pub wheelchairs_ramp: Option<bool>,
    pub air_conditioning: Option<bool>,
    pub usb: Option<bool>,
    pub bike_holders: Option<u32>,
    pub kneeling_mechanism: Option<bool>,
    /// Free text, e.g. "niska" or "100% niskopodłogowy".
    pub floor_height: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
}

/// Keys of a stop-dataset document that are never dataset dates.
const NON_DATASET_KEYS: [&str; 2] = ["lastUpdate", "stops"];

/// Extract the stop entries from a stop-dataset document.
///
/// The documents are keyed by dataset date ("YYYY-MM-DD"); the
/// lexicographically greatest key is the most recent dataset. Its value
/// is either an object holding a `stops` array or the array itself.
/// Documents without date keys may carry a top-level `stops` array.
pub fn extract_stop_entries(doc: &Value) -> Result<Vec<StopEntry>, ZtmError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| ZtmError::Shape("top level is not an object".into()))?;

    let latest = obj
        .keys()
        .filter(|k| !NON_DATASET_KEYS.contains(&k.as_str()))
        .max();

    let items: &[Value] = if let Some(key) = latest {
        match &obj[key.as_str()] {
            Value::Array(items) => items,
            Value::Object(dataset) => dataset
                .get("stops")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .ok_or_else(|| {
                    ZtmError::Shape(format!("dataset {key} has no stops array"))
                })?,
            _ => {
                return Err(ZtmError::Shape(format!(
                    "dataset {key} is neither an array nor an object"
                )));
            }
        }
    } else if let Some(Value::Array(items)) = obj.get("stops") {
        items
    } else {
        return Err(ZtmError::Shape(
            "no dataset date key and no stops array".into(),
        ));
    };

    Ok(decode_entries(items, "stop"))
}

/// Decode a slice of JSON values into typed entries, skipping the ones
/// that fail instead of failing the whole document.
pub(crate) fn decode_entries<T: DeserializeOwned>(items: &[Value], what: &str) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(entry) => out.push(entry),
            Err(e) => {
                skipped += 1;
                debug!(error = %e, what, "skipping malformed entry");
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, what, "skipped malformed entries");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_departure_tolerates_number_route() {
        let dep: RawDeparture = serde_json::from_value(json!({
            "routeShortName": 6,
            "headsign": "Jelitkowo",
            "vehicleCode": 2746,
        }))
        .unwrap();
        assert_eq!(dep.route_short_name.as_deref(), Some("6"));
        assert_eq!(
            dep.vehicle_code,
            Some(VehicleCode::parse("2746").unwrap())
        );
        assert!(dep.estimated_time.is_none());
    }

    #[test]
    fn raw_departure_tolerates_null_vehicle() {
        let dep: RawDeparture = serde_json::from_value(json!({
            "routeShortName": "N5",
            "vehicleCode": null,
        }))
        .unwrap();
        assert_eq!(dep.route_short_name.as_deref(), Some("N5"));
        assert!(dep.vehicle_code.is_none());
    }

    #[test]
    fn departures_response_defaults_to_empty() {
        let resp: DeparturesResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.departures.is_empty());
    }

    #[test]
    fn display_name_prefers_stop_desc() {
        let entry: StopEntry = serde_json::from_value(json!({
            "stopDesc": "Brama Wyżynna",
            "stopName": "Other",
        }))
        .unwrap();
        assert_eq!(entry.display_name(), Some("Brama Wyżynna"));
    }

    #[test]
    fn display_name_skips_empty_candidates() {
        let entry: StopEntry = serde_json::from_value(json!({
            "stopDesc": "",
            "stopName": "  ",
            "name": "Oliwa",
        }))
        .unwrap();
        assert_eq!(entry.display_name(), Some("Oliwa"));

        let nameless: StopEntry = serde_json::from_value(json!({"stopId": 1})).unwrap();
        assert_eq!(nameless.display_name(), None);
    }

    #[test]
    fn is_tram_handles_both_type_shapes() {
        let numeric: StopEntry = serde_json::from_value(json!({"type": 2})).unwrap();
        assert!(numeric.is_tram());

        let stringy: StopEntry = serde_json::from_value(json!({"type": "TRAM"})).unwrap();
        assert!(stringy.is_tram());

        let bus: StopEntry = serde_json::from_value(json!({"type": 1})).unwrap();
        assert!(!bus.is_tram());

        let missing: StopEntry = serde_json::from_value(json!({})).unwrap();
        assert!(!missing.is_tram());
    }

    #[test]
    fn stop_id_accepts_numeric_string() {
        let entry: StopEntry = serde_json::from_value(json!({"stopId": "14562"})).unwrap();
        assert_eq!(entry.stop_id, Some(14562));
    }

    #[test]
    fn extract_picks_latest_dataset_key() {
        let doc = json!({
            "lastUpdate": "whenever",
            "2024-01-01": {"stops": [{"stopId": 1, "stopName": "Old"}]},
            "2024-06-15": {"stops": [{"stopId": 2, "stopName": "New"}]},
        });
        let entries = extract_stop_entries(&doc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stop_id, Some(2));
        assert_eq!(entries[0].stop_name.as_deref(), Some("New"));
    }

    #[test]
    fn extract_handles_bare_array_dataset() {
        let doc = json!({
            "2024-06-15": [{"stopId": 3, "stopName": "Bare"}],
        });
        let entries = extract_stop_entries(&doc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stop_id, Some(3));
    }

    #[test]
    fn extract_falls_back_to_top_level_stops() {
        let doc = json!({
            "lastUpdate": "whenever",
            "stops": [{"stopId": 4}],
        });
        let entries = extract_stop_entries(&doc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stop_id, Some(4));
    }

    #[test]
    fn extract_rejects_unknown_shapes() {
        assert!(extract_stop_entries(&json!([])).is_err());
        assert!(extract_stop_entries(&json!({"lastUpdate": "x"})).is_err());
        assert!(extract_stop_entries(&json!({"2024-06-15": {"nope": []}})).is_err());
    }

    #[test]
    fn decode_entries_skips_malformed() {
        let items = vec![
            json!({"stopId": 1, "stopName": "Good"}),
            json!({"stopId": 2, "stopLat": "not a float"}),
            json!({"stopId": 3}),
        ];
        let entries: Vec<StopEntry> = decode_entries(&items, "stop");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stop_id, Some(1));
        assert_eq!(entries[1].stop_id, Some(3));
    }

    #[test]
    fn vehicle_entry_full_decode() {
        let entry: VehicleEntry = serde_json::from_value(json!({
            "vehicleCode": "2746",
            "wheelchairsRamp": true,
            "airConditioning": false,
            "usb": true,
            "bikeHolders": 2,
            "kneelingMechanism": true,
            "floorHeight": "niska",
            "brand": "Solaris",
            "model": "Urbino 18",
        }))
        .unwrap();
        assert_eq!(
            entry.vehicle_code,
            Some(VehicleCode::parse("2746").unwrap())
        );
        assert_eq!(entry.bike_holders, Some(2));
        assert_eq!(entry.floor_height.as_deref(), Some("niska"));
    }
}
