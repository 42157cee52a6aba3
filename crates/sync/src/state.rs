//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SyncConfig;
use crate::services::events::ReconcileLog;
use crate::shopify::RestClient;

/// Application state shared across all handlers and the scheduler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SyncConfig,
    shopify: RestClient,
    events: ReconcileLog,
}

impl AppState {
    /// Build state from configuration, constructing the Shopify client.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        let shopify = RestClient::new(&config.shopify);
        Self::with_client(config, shopify)
    }

    /// Build state around an existing client (tests inject a mock-backed
    /// one here).
    #[must_use]
    pub fn with_client(config: SyncConfig, shopify: RestClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                shopify,
                events: ReconcileLog::default(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn shopify(&self) -> &RestClient {
        &self.inner.shopify
    }

    #[must_use]
    pub fn events(&self) -> &ReconcileLog {
        &self.inner.events
    }
}
