//! Mock transit API for testing without network access.
//!
//! Programmable per-stop departures, per-source stop datasets, and a
//! vehicle database, plus switches for failure injection. Fetch counters
//! let tests assert that caches do not re-fetch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::StopId;

use super::error::ZtmError;
use super::types::{RawDeparture, StopEntry, VehicleEntry};
use super::{StopSource, TransitApi};

#[derive(Default)]
struct MockState {
    sources: Vec<StopSource>,
    /// Datasets keyed by source label; a source without a dataset fails.
    datasets: HashMap<String, Vec<StopEntry>>,
    departures: HashMap<StopId, Vec<RawDeparture>>,
    failing_stops: HashSet<StopId>,
    vehicles: Option<Vec<VehicleEntry>>,
    session_failure: bool,
}

/// In-memory [`TransitApi`] implementation.
#[derive(Clone, Default)]
pub struct MockTransitApi {
    state: Arc<Mutex<MockState>>,
    stop_dataset_fetches: Arc<AtomicUsize>,
    vehicle_fetches: Arc<AtomicUsize>,
    departure_fetches: Arc<AtomicUsize>,
}

impl MockTransitApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stop-metadata source serving the given entries.
    pub fn with_stop_dataset(self, label: &str, entries: Vec<StopEntry>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .sources
                .push(StopSource::new(label, format!("mock:{label}")));
            state.datasets.insert(label.to_string(), entries);
        }
        self
    }

    /// Add a stop-metadata source that always fails to fetch.
    pub fn with_failing_stop_source(self, label: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .sources
                .push(StopSource::new(label, format!("mock:{label}")));
        }
        self
    }

    /// Serve the given departures for a stop.
    pub fn with_departures(self, stop: StopId, departures: Vec<RawDeparture>) -> Self {
        self.state
            .lock()
            .unwrap()
            .departures
            .insert(stop, departures);
        self
    }

    /// Make departures fetches for a stop fail (as if timed out).
    pub fn with_failing_stop(self, stop: StopId) -> Self {
        self.state.lock().unwrap().failing_stops.insert(stop);
        self
    }

    /// Serve the given vehicle database.
    pub fn with_vehicles(self, entries: Vec<VehicleEntry>) -> Self {
        self.state.lock().unwrap().vehicles = Some(entries);
        self
    }

    /// Replace the vehicle database at runtime; `None` makes the vehicle
    /// fetch fail.
    pub fn set_vehicles(&self, entries: Option<Vec<VehicleEntry>>) {
        self.state.lock().unwrap().vehicles = entries;
    }

    /// Toggle session-level failure: every call returns a client error
    /// that [`ZtmError::is_session_error`] classifies as fatal.
    pub fn set_session_failure(&self, failing: bool) {
        self.state.lock().unwrap().session_failure = failing;
    }

    pub fn stop_dataset_fetch_count(&self) -> usize {
        self.stop_dataset_fetches.load(Ordering::SeqCst)
    }

    pub fn vehicle_fetch_count(&self) -> usize {
        self.vehicle_fetches.load(Ordering::SeqCst)
    }

    pub fn departure_fetch_count(&self) -> usize {
        self.departure_fetches.load(Ordering::SeqCst)
    }

    fn check_session(&self) -> Result<(), ZtmError> {
        if self.state.lock().unwrap().session_failure {
            Err(ZtmError::Client("mock session failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TransitApi for MockTransitApi {
    fn stop_sources(&self) -> Vec<StopSource> {
        self.state.lock().unwrap().sources.clone()
    }

    async fn departures(&self, stop: &StopId) -> Result<Vec<RawDeparture>, ZtmError> {
        self.departure_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_session()?;

        let state = self.state.lock().unwrap();
        if state.failing_stops.contains(stop) {
            return Err(ZtmError::Api {
                status: 408,
                message: format!("mock timeout for stop {stop}"),
            });
        }
        Ok(state.departures.get(stop).cloned().unwrap_or_default())
    }

    async fn stop_dataset(&self, source: &StopSource) -> Result<Vec<StopEntry>, ZtmError> {
        self.stop_dataset_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_session()?;

        let state = self.state.lock().unwrap();
        state
            .datasets
            .get(&source.label)
            .cloned()
            .ok_or_else(|| ZtmError::Api {
                status: 500,
                message: format!("mock failure for source {}", source.label),
            })
    }

    async fn vehicles(&self) -> Result<Vec<VehicleEntry>, ZtmError> {
        self.vehicle_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_session()?;

        let state = self.state.lock().unwrap();
        state.vehicles.clone().ok_or_else(|| ZtmError::Api {
            status: 503,
            message: "mock vehicle database unavailable".into(),
        })
    }
}
