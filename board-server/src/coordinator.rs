//! Refresh orchestration.
//!
//! One [`Coordinator`] per configured board. Each cycle makes sure the
//! stop and vehicle directories are loaded, fetches departures for every
//! configured stop concurrently, normalizes them, and publishes an
//! immutable [`Snapshot`]. A failed stop degrades to an empty list; only
//! session-level client failures abort the cycle, keeping the previous
//! snapshot on display.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::BoardConfig;
use crate::domain::{Departure, StopId, StopRecord};
use crate::normalize::normalize;
use crate::stops::StopDirectory;
use crate::vehicles::VehicleDirectory;
use crate::ztm::{TransitApi, ZtmError};

/// Immutable result of one successful refresh cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Normalized departures per configured stop. Every configured stop
    /// has an entry, possibly empty.
    pub departures: HashMap<StopId, Vec<Departure>>,
    /// Stop metadata as of this cycle.
    pub stops: HashMap<StopId, StopRecord>,
    /// RFC 3339 timestamp of the cycle.
    pub as_of: String,
}

/// A refresh cycle failure that keeps the previous snapshot in place.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("session failure talking to the transit API: {0}")]
    Session(ZtmError),
}

/// Polls the transit API for one board and publishes snapshots.
pub struct Coordinator {
    api: Arc<dyn TransitApi>,
    stops: StopDirectory,
    vehicles: VehicleDirectory,
    config: BoardConfig,
    /// Stop-name loading is attempted once; fallbacks make the directory
    /// total afterwards, so the gate is terminal.
    stop_names_loaded: AtomicBool,
    /// Vehicle loading retries every cycle until it first succeeds.
    vehicles_loaded: AtomicBool,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    last_error: RwLock<Option<String>>,
    refresh: Notify,
}

impl Coordinator {
    pub fn new(api: Arc<dyn TransitApi>, config: BoardConfig) -> Self {
        Self {
            stops: StopDirectory::new(api.clone()),
            vehicles: VehicleDirectory::new(api.clone()),
            api,
            config,
            stop_names_loaded: AtomicBool::new(false),
            vehicles_loaded: AtomicBool::new(false),
            snapshot: RwLock::new(None),
            last_error: RwLock::new(None),
            refresh: Notify::new(),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// The latest published snapshot, if any cycle has succeeded.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().await.clone()
    }

    /// The message of the last failed cycle, cleared on success.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Wake the polling loop for an immediate refresh.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Drop the cached stop names and reload them from the sources, then
    /// schedule a refresh so the next snapshot carries the new names.
    pub async fn refresh_stop_names(&self) {
        self.stops.clear().await;
        let resolved = self.stops.fill(&self.config.stop_ids).await;
        info!(resolved, "stop names reloaded");
        self.stop_names_loaded.store(true, Ordering::SeqCst);
        self.request_refresh();
    }

    /// Reload the vehicle database now, outside the regular cycle.
    pub async fn refresh_vehicles(&self) -> Result<usize, ZtmError> {
        let count = self.vehicles.fill().await?;
        self.vehicles_loaded.store(true, Ordering::SeqCst);
        self.request_refresh();
        Ok(count)
    }

    /// Run one refresh cycle and publish a snapshot on success.
    pub async fn run_cycle(&self) -> Result<Arc<Snapshot>, UpdateError> {
        // Stop names load once; after the attempt the directory is total
        // (fallback records), so there is nothing to retry.
        if !self.stop_names_loaded.load(Ordering::SeqCst) {
            self.stops.fill(&self.config.stop_ids).await;
            self.stop_names_loaded.store(true, Ordering::SeqCst);
        }

        // The vehicle database is optional per cycle but retried until it
        // first loads.
        if !self.vehicles_loaded.load(Ordering::SeqCst) {
            match self.vehicles.fill().await {
                Ok(_) => self.vehicles_loaded.store(true, Ordering::SeqCst),
                Err(e) if e.is_session_error() => return self.fail(e).await,
                Err(e) => warn!(error = %e, "vehicle database unavailable, will retry"),
            }
        }

        let fetches = self.config.stop_ids.iter().map(|id| async move {
            (id.clone(), self.api.departures(id).await)
        });
        let results = join_all(fetches).await;

        let now = Utc::now();
        let mut departures = HashMap::with_capacity(results.len());
        for (stop, result) in results {
            let raw = match result {
                Ok(raw) => raw,
                Err(e) if e.is_session_error() => return self.fail(e).await,
                Err(e) => {
                    warn!(stop = %stop, error = %e, "departures fetch failed");
                    departures.insert(stop, Vec::new());
                    continue;
                }
            };

            let mut normalized = Vec::with_capacity(raw.len().min(self.config.max_departures));
            for departure in raw.iter().take(self.config.max_departures) {
                let vehicle = self.vehicles.lookup(departure.vehicle_code.as_ref()).await;
                normalized.push(normalize(
                    departure,
                    vehicle,
                    now,
                    &self.config.icons,
                    &self.config.format,
                ));
            }
            debug!(stop = %stop, count = normalized.len(), "stop refreshed");
            departures.insert(stop, normalized);
        }

        let snapshot = Arc::new(Snapshot {
            departures,
            stops: self.stops.to_map().await,
            as_of: now.to_rfc3339(),
        });

        *self.snapshot.write().await = Some(snapshot.clone());
        *self.last_error.write().await = None;

        Ok(snapshot)
    }

    async fn fail(&self, e: ZtmError) -> Result<Arc<Snapshot>, UpdateError> {
        error!(error = %e, "refresh cycle aborted");
        *self.last_error.write().await = Some(e.to_string());
        Err(UpdateError::Session(e))
    }

    /// Poll forever at the configured interval, with the first cycle run
    /// immediately. [`request_refresh`](Coordinator::request_refresh)
    /// short-circuits the wait.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.scan_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.refresh.notified() => {
                    interval.reset();
                }
            }
            if let Err(e) = self.run_cycle().await {
                warn!(error = %e, "keeping previous snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::normalize::{DEFAULT_FORMAT, IconSet};
    use crate::ztm::mock::MockTransitApi;
    use crate::ztm::{RawDeparture, StopEntry, VehicleEntry};
    use serde_json::json;
    use std::time::Duration;

    fn stop(id: &str) -> StopId {
        StopId::parse(id).unwrap()
    }

    fn config(ids: &[&str]) -> BoardConfig {
        BoardConfig {
            stop_ids: ids.iter().map(|id| stop(id)).collect(),
            scan_interval: Duration::from_secs(30),
            max_departures: 5,
            icons: IconSet::default(),
            format: DEFAULT_FORMAT.to_string(),
        }
    }

    fn stop_entry(value: serde_json::Value) -> StopEntry {
        serde_json::from_value(value).unwrap()
    }

    fn vehicle_entry(value: serde_json::Value) -> VehicleEntry {
        serde_json::from_value(value).unwrap()
    }

    fn departure(route: &str, headsign: &str) -> RawDeparture {
        serde_json::from_value(json!({
            "routeShortName": route,
            "headsign": headsign,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn failed_stop_degrades_to_empty_list() {
        let api = MockTransitApi::new()
            .with_departures(stop("1"), vec![departure("6", "Jelitkowo")])
            .with_failing_stop(stop("2"))
            .with_departures(stop("3"), vec![departure("12", "Migowo")]);
        let coordinator = Coordinator::new(Arc::new(api), config(&["1", "2", "3"]));

        let snapshot = coordinator.run_cycle().await.unwrap();

        assert_eq!(snapshot.departures[&stop("1")].len(), 1);
        assert!(snapshot.departures[&stop("2")].is_empty());
        assert_eq!(snapshot.departures[&stop("3")].len(), 1);
        assert!(coordinator.last_error().await.is_none());
    }

    #[tokio::test]
    async fn session_failure_keeps_previous_snapshot() {
        let api = MockTransitApi::new()
            .with_departures(stop("1"), vec![departure("6", "Jelitkowo")]);
        let handle = api.clone();
        let coordinator = Coordinator::new(Arc::new(api), config(&["1"]));

        let first = coordinator.run_cycle().await.unwrap();

        handle.set_session_failure(true);
        assert!(coordinator.run_cycle().await.is_err());

        let current = coordinator.snapshot().await.unwrap();
        assert_eq!(current.as_of, first.as_of);
        assert!(coordinator.last_error().await.is_some());

        handle.set_session_failure(false);
        coordinator.run_cycle().await.unwrap();
        assert!(coordinator.last_error().await.is_none());
    }

    #[tokio::test]
    async fn stop_name_gate_is_terminal() {
        // No dataset source succeeds; the directory falls back and never
        // re-fetches on later cycles.
        let api = MockTransitApi::new().with_failing_stop_source("stops.json");
        let handle = api.clone();
        let coordinator = Coordinator::new(Arc::new(api), config(&["1"]));

        coordinator.run_cycle().await.unwrap();
        let after_first = handle.stop_dataset_fetch_count();
        assert_eq!(after_first, 1);

        coordinator.run_cycle().await.unwrap();
        assert_eq!(handle.stop_dataset_fetch_count(), after_first);

        let snapshot = coordinator.snapshot().await.unwrap();
        assert!(snapshot.stops[&stop("1")].is_fallback);
    }

    #[tokio::test]
    async fn vehicle_gate_retries_until_success() {
        let api = MockTransitApi::new();
        let handle = api.clone();
        let coordinator = Coordinator::new(Arc::new(api), config(&["1"]));

        coordinator.run_cycle().await.unwrap();
        coordinator.run_cycle().await.unwrap();
        assert_eq!(handle.vehicle_fetch_count(), 2);

        handle.set_vehicles(Some(vec![vehicle_entry(json!({"vehicleCode": 1}))]));
        coordinator.run_cycle().await.unwrap();
        assert_eq!(handle.vehicle_fetch_count(), 3);

        // Loaded now; no further fetches.
        coordinator.run_cycle().await.unwrap();
        assert_eq!(handle.vehicle_fetch_count(), 3);
    }

    #[tokio::test]
    async fn max_departures_truncates() {
        let raws: Vec<RawDeparture> = (0..8).map(|i| departure("6", &format!("H{i}"))).collect();
        let api = MockTransitApi::new().with_departures(stop("1"), raws);
        let mut cfg = config(&["1"]);
        cfg.max_departures = 3;
        let coordinator = Coordinator::new(Arc::new(api), cfg);

        let snapshot = coordinator.run_cycle().await.unwrap();
        let listed = &snapshot.departures[&stop("1")];
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].headsign, "H0");
        assert_eq!(listed[2].headsign, "H2");
    }

    #[tokio::test]
    async fn snapshot_carries_stop_metadata() {
        let api = MockTransitApi::new().with_stop_dataset(
            "stops.json",
            vec![stop_entry(json!({"stopId": 1, "stopName": "Oliwa"}))],
        );
        let coordinator = Coordinator::new(Arc::new(api), config(&["1"]));

        let snapshot = coordinator.run_cycle().await.unwrap();
        assert_eq!(snapshot.stops[&stop("1")].name, "Oliwa");
        assert!(!snapshot.stops[&stop("1")].is_fallback);
    }

    #[tokio::test]
    async fn departures_use_vehicle_equipment() {
        let raw: RawDeparture = serde_json::from_value(json!({
            "routeShortName": "6",
            "headsign": "Jelitkowo",
            "vehicleCode": "2746",
        }))
        .unwrap();
        let api = MockTransitApi::new()
            .with_departures(stop("1"), vec![raw])
            .with_vehicles(vec![vehicle_entry(json!({
                "vehicleCode": 2746,
                "wheelchairsRamp": true,
            }))]);
        let coordinator = Coordinator::new(Arc::new(api), config(&["1"]));

        let snapshot = coordinator.run_cycle().await.unwrap();
        let dep = &snapshot.departures[&stop("1")][0];
        assert!(dep.vehicle.wheelchair_accessible);
        assert_eq!(dep.icons, IconSet::default().wheelchair);
    }

    #[tokio::test]
    async fn forced_stop_name_refresh_reloads() {
        let api = MockTransitApi::new().with_stop_dataset(
            "stops.json",
            vec![stop_entry(json!({"stopId": 1, "stopName": "Oliwa"}))],
        );
        let handle = api.clone();
        let coordinator = Coordinator::new(Arc::new(api), config(&["1"]));

        coordinator.run_cycle().await.unwrap();
        assert_eq!(handle.stop_dataset_fetch_count(), 1);

        coordinator.refresh_stop_names().await;
        assert_eq!(handle.stop_dataset_fetch_count(), 2);
    }
}
