//! Stop directory cache.
//!
//! Maps stop ids to static display metadata, filled lazily from the
//! configured stop-metadata sources. After a fill every requested id has
//! an entry: ids no source knew get a synthetic fallback record, so
//! lookups are total regardless of network outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{StopId, StopRecord, TransportKind};
use crate::ztm::{StopEntry, TransitApi};

/// Thread-safe stop metadata lookup.
///
/// Entries are immutable once created; the only mutations are partial
/// fills of missing ids and the bulk [`clear`](StopDirectory::clear) used
/// by the forced stop-name refresh.
pub struct StopDirectory {
    api: Arc<dyn TransitApi>,
    inner: RwLock<HashMap<StopId, StopRecord>>,
}

impl StopDirectory {
    pub fn new(api: Arc<dyn TransitApi>) -> Self {
        Self {
            api,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a stop record, degrading to a synthetic fallback record
    /// when the id was never resolved.
    pub async fn lookup(&self, id: &StopId) -> StopRecord {
        let guard = self.inner.read().await;
        guard
            .get(id)
            .cloned()
            .unwrap_or_else(|| StopRecord::fallback(id))
    }

    /// Whether an entry (resolved or fallback) exists for the id.
    pub async fn contains(&self, id: &StopId) -> bool {
        self.inner.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Clone the full directory, for snapshot assembly.
    pub async fn to_map(&self) -> HashMap<StopId, StopRecord> {
        self.inner.read().await.clone()
    }

    /// Drop all entries. Combined with [`fill`](StopDirectory::fill) this
    /// implements the forced stop-name refresh.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Fill the directory for the given ids.
    ///
    /// Sources are tried in preference order; a source that fails to
    /// fetch or parse is logged and skipped. Ids that are already cached
    /// are never re-fetched or mutated. Ids left unresolved after all
    /// sources get a fallback record, so `fill` always leaves every
    /// requested id with an entry.
    ///
    /// Returns the number of ids resolved from a source (fallbacks not
    /// counted).
    pub async fn fill(&self, ids: &[StopId]) -> usize {
        let missing = self.still_missing(ids).await;
        if missing.is_empty() {
            debug!("all stop names already cached");
            return 0;
        }

        info!(count = missing.len(), "fetching stop metadata");

        let mut resolved = 0usize;
        for source in self.api.stop_sources() {
            let still = self.still_missing(&missing).await;
            if still.is_empty() {
                break;
            }

            debug!(source = %source.label, count = still.len(), "trying stop source");
            match self.api.stop_dataset(&source).await {
                Ok(entries) => {
                    let found = self.absorb(&entries, &still).await;
                    info!(
                        source = %source.label,
                        found,
                        requested = still.len(),
                        "stop source processed"
                    );
                    resolved += found;
                }
                Err(e) => {
                    warn!(source = %source.label, error = %e, "stop source failed");
                }
            }
        }

        let still = self.still_missing(&missing).await;
        if !still.is_empty() {
            warn!(count = still.len(), "stops not found in any source; using fallbacks");
            let mut guard = self.inner.write().await;
            for id in still {
                guard
                    .entry(id.clone())
                    .or_insert_with(|| StopRecord::fallback(&id));
            }
        }

        resolved
    }

    async fn still_missing(&self, ids: &[StopId]) -> Vec<StopId> {
        let guard = self.inner.read().await;
        ids.iter()
            .filter(|id| !guard.contains_key(id))
            .cloned()
            .collect()
    }

    /// Cache every wanted entry from one source's dataset. Returns the
    /// number of entries inserted.
    async fn absorb(&self, entries: &[StopEntry], wanted: &[StopId]) -> usize {
        let wanted: HashSet<&StopId> = wanted.iter().collect();
        let mut found = 0usize;

        let mut guard = self.inner.write().await;
        for entry in entries {
            let Some(id) = entry.stop_id.map(StopId::from_number) else {
                continue;
            };
            if !wanted.contains(&id) || guard.contains_key(&id) {
                continue;
            }

            let Some(record) = record_from_entry(entry) else {
                debug!(stop = %id, "stop entry has no usable name");
                continue;
            };

            debug!(stop = %id, name = %record.name, "cached stop");
            guard.insert(id, record);
            found += 1;
        }

        found
    }
}

/// Build a stop record from a dataset entry. `None` when the entry has no
/// usable display name.
fn record_from_entry(entry: &StopEntry) -> Option<StopRecord> {
    let short_name = entry.display_name()?.to_string();

    let sub_name = [entry.sub_name.as_deref(), entry.platform.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(pad_platform)
        .unwrap_or_default();

    let name = if sub_name.is_empty() {
        short_name.clone()
    } else {
        format!("{short_name} {sub_name}")
    };

    let zone = [entry.zone_name.as_deref(), entry.zone.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();

    Some(StopRecord {
        name,
        short_name,
        platform: sub_name,
        zone,
        lat: entry.stop_lat,
        lon: entry.stop_lon,
        kind: if entry.is_tram() {
            TransportKind::Tram
        } else {
            TransportKind::Bus
        },
        wheelchair_accessible: entry.wheelchair_boarding == Some(1),
        on_demand: entry.on_demand.unwrap_or(0) != 0,
        zone_border: entry.ticket_zone_border.unwrap_or(0) != 0,
        is_fallback: false,
    })
}

/// Platform numbers are zero-padded to two digits ("1" becomes "01");
/// non-numeric sub-names pass through unchanged.
fn pad_platform(s: &str) -> String {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        format!("{s:0>2}")
    } else {
        s.to_string()
    }
}
