//! ZTM open-data HTTP client.
//!
//! Fetches the three upstream feeds: per-stop departures, the stop
//! datasets, and the vehicle database. No session is kept between calls;
//! each request carries its own timeout (short for departures, long for
//! the bulk directory downloads).

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::StopId;

use super::error::ZtmError;
use super::types::{
    DeparturesResponse, RawDeparture, StopEntry, VehicleEntry, decode_entries,
    extract_stop_entries,
};
use super::TransitApi;

/// Default base URL for the departures feed.
const DEFAULT_DEPARTURES_URL: &str = "https://ckan2.multimediagdansk.pl/departures";

/// Default URL for the Gdańsk-local stop dataset (smaller, tried first).
const DEFAULT_STOPS_GDANSK_URL: &str = "https://ckan.multimediagdansk.pl/dataset/c24aa637-3619-4dc2-a171-a23eec8f2172/resource/d3e96eb6-25ad-4d6c-8651-b1eb39155945/download/stopsingdansk.json";

/// Default URL for the full regional stop dataset.
const DEFAULT_STOPS_URL: &str = "https://ckan.multimediagdansk.pl/dataset/c24aa637-3619-4dc2-a171-a23eec8f2172/resource/4c4025f0-01bf-41f7-a39f-d156d201b82b/download/stops.json";

/// Default URL for the vehicle database.
const DEFAULT_VEHICLES_URL: &str =
    "https://files.cloudgdansk.pl/d/otwarte-dane/ztm/baza-pojazdow.json";

/// Default timeout for a per-stop departures request.
const DEFAULT_DEPARTURES_TIMEOUT_SECS: u64 = 15;

/// Default timeout for a bulk directory download.
const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 60;

/// One source for stop metadata. Sources are tried in listed order until
/// every requested stop id is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopSource {
    /// Short label used in logs.
    pub label: String,
    pub url: String,
}

impl StopSource {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Configuration for the ZTM client.
#[derive(Debug, Clone)]
pub struct ZtmConfig {
    /// Base URL for the departures feed; queried as `?stopId={id}`.
    pub departures_url: String,
    /// Stop-metadata sources in preference order.
    pub stop_sources: Vec<StopSource>,
    /// URL for the vehicle database.
    pub vehicles_url: String,
    /// Timeout for one per-stop departures request.
    pub departures_timeout_secs: u64,
    /// Timeout for one bulk directory download.
    pub directory_timeout_secs: u64,
}

impl Default for ZtmConfig {
    fn default() -> Self {
        Self {
            departures_url: DEFAULT_DEPARTURES_URL.to_string(),
            stop_sources: vec![
                StopSource::new("stopsingdansk.json", DEFAULT_STOPS_GDANSK_URL),
                StopSource::new("stops.json", DEFAULT_STOPS_URL),
            ],
            vehicles_url: DEFAULT_VEHICLES_URL.to_string(),
            departures_timeout_secs: DEFAULT_DEPARTURES_TIMEOUT_SECS,
            directory_timeout_secs: DEFAULT_DIRECTORY_TIMEOUT_SECS,
        }
    }
}

impl ZtmConfig {
    /// Set a custom departures base URL (for testing).
    pub fn with_departures_url(mut self, url: impl Into<String>) -> Self {
        self.departures_url = url.into();
        self
    }

    /// Replace the stop-metadata sources.
    pub fn with_stop_sources(mut self, sources: Vec<StopSource>) -> Self {
        self.stop_sources = sources;
        self
    }

    /// Set a custom vehicle database URL (for testing).
    pub fn with_vehicles_url(mut self, url: impl Into<String>) -> Self {
        self.vehicles_url = url.into();
        self
    }
}

/// HTTP client for the ZTM open-data feeds.
#[derive(Debug, Clone)]
pub struct ZtmClient {
    http: reqwest::Client,
    config: ZtmConfig,
}

impl ZtmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ZtmConfig) -> Result<Self, ZtmError> {
        // Timeouts are per-request; the builder carries none.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ZtmError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL and parse the body as a JSON document.
    async fn get_json(&self, url: &str, timeout_secs: u64) -> Result<Value, ZtmError> {
        let response = self
            .http
            .get(url)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZtmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ZtmError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

#[async_trait]
impl TransitApi for ZtmClient {
    fn stop_sources(&self) -> Vec<StopSource> {
        self.config.stop_sources.clone()
    }

    async fn departures(&self, stop: &StopId) -> Result<Vec<RawDeparture>, ZtmError> {
        let url = format!("{}?stopId={}", self.config.departures_url, stop);
        let doc = self
            .get_json(&url, self.config.departures_timeout_secs)
            .await?;

        let response: DeparturesResponse =
            serde_json::from_value(doc).map_err(|e| ZtmError::Json {
                message: e.to_string(),
                body: None,
            })?;

        Ok(response.departures)
    }

    async fn stop_dataset(&self, source: &StopSource) -> Result<Vec<StopEntry>, ZtmError> {
        let doc = self
            .get_json(&source.url, self.config.directory_timeout_secs)
            .await?;
        extract_stop_entries(&doc)
    }

    async fn vehicles(&self) -> Result<Vec<VehicleEntry>, ZtmError> {
        let doc = self
            .get_json(&self.config.vehicles_url, self.config.directory_timeout_secs)
            .await?;

        let results = doc
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| ZtmError::Shape("vehicle database has no results array".into()))?;

        Ok(decode_entries(results, "vehicle"))
    }
}
