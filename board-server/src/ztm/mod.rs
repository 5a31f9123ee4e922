//! ZTM open-data HTTP plumbing.
//!
//! Provides async access to the three upstream feeds and the `TransitApi`
//! seam that lets the caches and the coordinator be tested without
//! network access.

mod client;
mod error;
pub mod mock;
mod types;

use async_trait::async_trait;

use crate::domain::StopId;

pub use client::{StopSource, ZtmClient, ZtmConfig};
pub use error::ZtmError;
pub use types::{
    DeparturesResponse, RawDeparture, StopEntry, VehicleEntry, extract_stop_entries,
};

/// Access to the upstream transit feeds.
///
/// This abstraction allows the directories and the coordinator to be
/// exercised with mock data.
#[async_trait]
pub trait TransitApi: Send + Sync {
    /// Stop-metadata sources in preference order.
    fn stop_sources(&self) -> Vec<StopSource>;

    /// Fetch the raw departures for one stop.
    async fn departures(&self, stop: &StopId) -> Result<Vec<RawDeparture>, ZtmError>;

    /// Fetch and decode one stop-metadata source.
    async fn stop_dataset(&self, source: &StopSource) -> Result<Vec<StopEntry>, ZtmError>;

    /// Fetch and decode the vehicle database.
    async fn vehicles(&self) -> Result<Vec<VehicleEntry>, ZtmError>;
}
