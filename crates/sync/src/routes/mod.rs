//! HTTP route handlers for the sync service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Health check
//!
//! # Webhooks (Shopify -> us, HMAC-verified)
//! POST /webhooks/inventory-levels   - inventory_levels/update notification
//!
//! # Manual triggers + dashboard data
//! POST /api/reconcile               - Reconcile one product now
//! POST /api/sweep                   - Kick off a full-catalog sweep
//! GET  /api/stats                   - Reconciliation counters and history
//! ```

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod api;
pub mod webhooks;

/// Build the service router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/inventory-levels", post(webhooks::inventory_levels))
        .route("/api/reconcile", post(api::reconcile_product))
        .route("/api/sweep", post(api::start_sweep))
        .route("/api/stats", get(api::stats))
}
