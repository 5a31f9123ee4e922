//! Registry of live boards.
//!
//! The web layer registers one [`Coordinator`] per configured board and
//! uses the registry to fan service actions (forced refresh, stop-name
//! reload) out to all of them.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::coordinator::Coordinator;

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<Vec<Arc<Coordinator>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, coordinator: Arc<Coordinator>) {
        self.inner.write().await.push(coordinator);
    }

    pub async fn all(&self) -> Vec<Arc<Coordinator>> {
        self.inner.read().await.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Schedule an immediate refresh on every board.
    pub async fn force_update(&self) {
        for coordinator in self.all().await {
            coordinator.request_refresh();
        }
    }

    /// Reload stop names on every board.
    pub async fn refresh_stop_names(&self) {
        for coordinator in self.all().await {
            coordinator.refresh_stop_names().await;
        }
    }
}
