//! Integration tests for Dogear Sync.
//!
//! Every test drives the real [`RestClient`] (and, where relevant, the full
//! axum router) against a `wiremock` stand-in for the Shopify Admin API.
//! No live store is touched.
//!
//! # Test Categories
//!
//! - `client_resilience` - rate limiting, pagination, caching behavior
//! - `reconcile_flow` - publish/unpublish decisions end to end
//!
//! [`RestClient`]: dogear_sync::shopify::RestClient

use std::time::Duration;

use secrecy::SecretString;
use wiremock::MockServer;

use dogear_sync::config::{ShopifyConfig, SyncConfig};
use dogear_sync::shopify::RestClient;
use dogear_sync::state::AppState;

/// API version baked into the mock paths.
pub const API_VERSION: &str = "2025-01";

/// Webhook secret used by signed-delivery tests.
pub const WEBHOOK_SECRET: &str = "whsec_integration_9f8e7d6c";

/// Access token presented to the mock server.
pub const ACCESS_TOKEN: &str = "shpat_integration_0a1b2c3d";

/// Versioned API root on the mock server, mirroring
/// `https://<store>/admin/api/<version>`.
#[must_use]
pub fn api_root(server: &MockServer) -> String {
    format!("{}/admin/api/{API_VERSION}", server.uri())
}

/// Mock-path prefix matching [`api_root`].
#[must_use]
pub fn api_path(resource: &str) -> String {
    format!("/admin/api/{API_VERSION}/{resource}")
}

/// A real client pointed at the mock server, default cache TTL.
#[must_use]
pub fn mock_client(server: &MockServer) -> RestClient {
    RestClient::from_base_url(api_root(server), ACCESS_TOKEN, Duration::from_secs(300))
}

/// Full application state wired to the mock server, for router-level tests.
#[must_use]
pub fn mock_state(server: &MockServer) -> AppState {
    let shopify = ShopifyConfig {
        store: "dogear-books.myshopify.com".to_string(),
        api_version: API_VERSION.to_string(),
        access_token: SecretString::from(ACCESS_TOKEN),
        webhook_secret: SecretString::from(WEBHOOK_SECRET),
        api_base_url: Some(api_root(server)),
        cache_ttl: Duration::from_secs(300),
    };

    let config = SyncConfig {
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        shopify,
        sweep_interval: Duration::from_secs(1800),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
    };

    let client = mock_client(server);
    AppState::with_client(config, client)
}
