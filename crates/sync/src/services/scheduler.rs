//! Full-catalog sweep and its interval scheduler.
//!
//! The sweep walks every used listing the scanner yields and reconciles each
//! variant. One product failing never stops the pass: failures are counted,
//! logged, and reported to Sentry, then the loop moves on. The scheduler is
//! a plain tokio task ticking at the configured interval; manual triggers
//! call [`run_sweep`] directly and own the decision to await or detach it.

use futures::{StreamExt, pin_mut};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::shopify::ShopifyError;
use crate::state::AppState;

use super::reconcile::reconcile;
use super::scanner::CatalogScanner;

/// Tally of one completed sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    /// Used listings the scanner yielded.
    pub products_seen: u32,
    /// Variants reconciled to a terminal action.
    pub reconciled: u32,
    /// Variants whose reconciliation errored.
    pub failures: u32,
    /// Whether the scan stopped early (circuit breaker or scan error) with
    /// part of the catalog unvisited.
    pub truncated: bool,
}

/// Run one full-catalog sweep, reconciling every used listing's variants.
#[instrument(skip(state))]
pub async fn run_sweep(state: &AppState) -> SweepSummary {
    info!("starting used-listing sweep");

    let mut summary = SweepSummary {
        products_seen: 0,
        reconciled: 0,
        failures: 0,
        truncated: false,
    };

    let scanner = CatalogScanner::new(state.shopify());
    let products = scanner.scan();
    pin_mut!(products);

    while let Some(item) = products.next().await {
        let product = match item {
            Ok(product) => product,
            Err(ShopifyError::CircuitBreaker { pages }) => {
                warn!(pages, "sweep truncated by scan circuit breaker");
                summary.truncated = true;
                break;
            }
            Err(err) => {
                error!(error = %err, "catalog scan failed mid-sweep");
                sentry::capture_error(&err);
                summary.truncated = true;
                break;
            }
        };

        summary.products_seen += 1;

        for variant in &product.variants {
            match reconcile(
                state.shopify(),
                variant.inventory_item_id,
                variant.id,
                product.id,
            )
            .await
            {
                Ok(Some(outcome)) => {
                    summary.reconciled += 1;
                    state.events().record(&outcome);
                }
                Ok(None) => {}
                Err(err) => {
                    summary.failures += 1;
                    state.events().record_failure();
                    error!(
                        product_id = product.id,
                        variant_id = variant.id,
                        error = %err,
                        "reconciliation failed during sweep"
                    );
                    sentry::capture_error(&err);
                }
            }
        }
    }

    info!(
        products = summary.products_seen,
        reconciled = summary.reconciled,
        failures = summary.failures,
        truncated = summary.truncated,
        "sweep complete"
    );

    summary
}

/// Spawn the interval scheduler. The returned handle lives as long as the
/// process; aborting it stops future sweeps without touching one in flight
/// on another task.
pub fn start(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config().sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The first tick completes immediately; consume it so sweeps run on
        // the interval, not at boot.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let summary = run_sweep(&state).await;
            state.events().record_sweep(summary);
        }
    })
}
