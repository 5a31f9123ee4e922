//! Vehicle directory cache.
//!
//! Maps vehicle codes to equipment metadata, bulk-loaded from the vehicle
//! database. A failed load leaves the cache in its prior state; lookups
//! for unknown vehicles degrade to default ("unknown equipment") records,
//! never failing the refresh cycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{VehicleCode, VehicleRecord};
use crate::ztm::{TransitApi, VehicleEntry, ZtmError};

/// Marker substring of the free-text `floorHeight` field that identifies
/// low-floor vehicles ("niska", "niskopodłogowy", ...).
const LOW_FLOOR_MARKER: &str = "nisk";

/// Thread-safe vehicle equipment lookup.
pub struct VehicleDirectory {
    api: Arc<dyn TransitApi>,
    inner: RwLock<HashMap<VehicleCode, VehicleRecord>>,
}

impl VehicleDirectory {
    pub fn new(api: Arc<dyn TransitApi>) -> Self {
        Self {
            api,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Bulk-load the vehicle database.
    ///
    /// On success the whole cache is replaced and the vehicle count is
    /// returned. On failure the existing cache is preserved and the error
    /// is returned; callers treat this as non-fatal.
    pub async fn fill(&self) -> Result<usize, ZtmError> {
        let entries = self.api.vehicles().await?;

        let mut map = HashMap::with_capacity(entries.len());
        for entry in &entries {
            let Some(code) = entry.vehicle_code.clone() else {
                debug!("vehicle entry without code skipped");
                continue;
            };
            map.insert(code, record_from_entry(entry));
        }

        let count = map.len();
        info!(count, "vehicle database loaded");

        let mut guard = self.inner.write().await;
        *guard = map;

        Ok(count)
    }

    /// Look up equipment for a vehicle. `None` codes and unknown codes
    /// yield the default record.
    pub async fn lookup(&self, code: Option<&VehicleCode>) -> VehicleRecord {
        let Some(code) = code else {
            return VehicleRecord::default();
        };
        let guard = self.inner.read().await;
        guard.get(code).cloned().unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// Derive the equipment record from a raw database entry.
fn record_from_entry(entry: &VehicleEntry) -> VehicleRecord {
    let low_floor = entry
        .floor_height
        .as_deref()
        .is_some_and(|h| h.to_lowercase().contains(LOW_FLOOR_MARKER));

    VehicleRecord {
        wheelchair_accessible: entry.wheelchairs_ramp.unwrap_or(false),
        low_floor,
        air_conditioning: entry.air_conditioning.unwrap_or(false),
        usb_chargers: entry.usb.unwrap_or(false),
        bike_holders: entry.bike_holders.unwrap_or(0),
        kneeling_mechanism: entry.kneeling_mechanism.unwrap_or(false),
        brand: entry.brand.clone().unwrap_or_default(),
        model: entry.model.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ztm::mock::MockTransitApi;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> VehicleEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn low_floor_derivation() {
        let low = record_from_entry(&entry(json!({"floorHeight": "niska"})));
        assert!(low.low_floor);

        let pct = record_from_entry(&entry(json!({"floorHeight": "100% Niskopodłogowy"})));
        assert!(pct.low_floor);

        let high = record_from_entry(&entry(json!({"floorHeight": "wysoka"})));
        assert!(!high.low_floor);

        let missing = record_from_entry(&entry(json!({})));
        assert!(!missing.low_floor);
    }

    #[tokio::test]
    async fn fill_and_lookup() {
        let api = MockTransitApi::new().with_vehicles(vec![entry(json!({
            "vehicleCode": "2746",
            "wheelchairsRamp": true,
            "bikeHolders": 2,
            "brand": "Solaris",
        }))]);
        let directory = VehicleDirectory::new(Arc::new(api));

        assert_eq!(directory.fill().await.unwrap(), 1);

        let code = VehicleCode::parse("2746").unwrap();
        let rec = directory.lookup(Some(&code)).await;
        assert!(rec.wheelchair_accessible);
        assert_eq!(rec.bike_holders, 2);
        assert_eq!(rec.brand, "Solaris");
    }

    #[tokio::test]
    async fn numeric_source_key_found_via_string_query() {
        // Regression for the int/str key-drift class: the database entry
        // carries the code as a JSON number, the departures feed as a
        // string. Both must land on the same cache slot.
        let api = MockTransitApi::new()
            .with_vehicles(vec![entry(json!({"vehicleCode": 2746, "usb": true}))]);
        let directory = VehicleDirectory::new(Arc::new(api));
        directory.fill().await.unwrap();

        let queried: VehicleCode = serde_json::from_str("\"2746\"").unwrap();
        assert!(directory.lookup(Some(&queried)).await.usb_chargers);
    }

    #[tokio::test]
    async fn lookup_degrades_to_default() {
        let directory = VehicleDirectory::new(Arc::new(MockTransitApi::new()));

        assert_eq!(directory.lookup(None).await, VehicleRecord::default());
        let unknown = VehicleCode::parse("1").unwrap();
        assert_eq!(
            directory.lookup(Some(&unknown)).await,
            VehicleRecord::default()
        );
    }

    #[tokio::test]
    async fn failed_fill_preserves_prior_state() {
        let api = MockTransitApi::new()
            .with_vehicles(vec![entry(json!({"vehicleCode": 1, "usb": true}))]);
        let api_handle = api.clone();
        let directory = VehicleDirectory::new(Arc::new(api));

        directory.fill().await.unwrap();
        assert_eq!(directory.len().await, 1);

        api_handle.set_vehicles(None);
        assert!(directory.fill().await.is_err());

        // Prior state intact.
        assert_eq!(directory.len().await, 1);
        let code = VehicleCode::from_number(1);
        assert!(directory.lookup(Some(&code)).await.usb_chargers);
    }

    #[tokio::test]
    async fn entries_without_code_are_skipped() {
        let api = MockTransitApi::new().with_vehicles(vec![
            entry(json!({"usb": true})),
            entry(json!({"vehicleCode": 5})),
        ]);
        let directory = VehicleDirectory::new(Arc::new(api));

        assert_eq!(directory.fill().await.unwrap(), 1);
    }
}
