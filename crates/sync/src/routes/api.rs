//! Manual trigger and dashboard-data routes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::services::events::StatsSnapshot;
use crate::services::reconcile::reconcile;
use crate::services::scheduler::run_sweep;
use crate::state::AppState;

/// Body for `POST /api/reconcile`.
#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
    pub product_id: i64,
    pub variant_id: i64,
    pub inventory_item_id: i64,
}

/// Reconcile one product immediately and return the outcome.
#[instrument(skip(state))]
pub async fn reconcile_product(
    State(state): State<AppState>,
    Json(params): Json<ReconcileParams>,
) -> Result<Json<Value>, AppError> {
    let outcome = reconcile(
        state.shopify(),
        params.inventory_item_id,
        params.variant_id,
        params.product_id,
    )
    .await
    .inspect_err(|_| state.events().record_failure())?;

    match outcome {
        Some(outcome) => {
            state.events().record(&outcome);
            Ok(Json(json!(outcome)))
        }
        None => Ok(Json(json!({
            "product_id": params.product_id,
            "message": "nothing to reconcile",
        }))),
    }
}

/// Kick off a full-catalog sweep without holding the request open.
///
/// The sweep runs as a detached task; its completion lands in the event log
/// and the process logs, not in this response.
#[instrument(skip(state))]
pub async fn start_sweep(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("manual sweep requested");

    let task_state = state.clone();
    tokio::spawn(async move {
        let summary = run_sweep(&task_state).await;
        task_state.events().record_sweep(summary);
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({"message": "sweep started"})),
    )
}

/// Read-only reconciliation stats for the dashboard.
pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.events().snapshot())
}
