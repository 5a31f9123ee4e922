//! Application state for the web layer.

use std::sync::Arc;

use crate::registry::Registry;
use crate::ztm::TransitApi;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Live boards, one coordinator each.
    pub registry: Registry,

    /// Transit API handle, used to validate new board configurations.
    pub api: Arc<dyn TransitApi>,
}

impl AppState {
    pub fn new(registry: Registry, api: Arc<dyn TransitApi>) -> Self {
        Self { registry, api }
    }
}
