//! The reconciliation engine: one inventory observation in, one idempotent
//! publish/redirect decision out.
//!
//! Both triggers (webhook and sweep) funnel into [`reconcile`]. The engine
//! never trusts quantities carried by a notification; it re-fetches product
//! and inventory state on every invocation, so duplicated or reordered
//! deliveries converge on whatever the platform currently reports.
//!
//! Failure policy: inventory lookups and publish-state writes propagate
//! (without them there is no decision); redirect bookkeeping never does -
//! see [`redirects`](super::redirects).

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::shopify::{RestClient, ShopifyError};

use super::{inventory, products, redirects};

/// Terminal action a reconciliation settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    Published,
    Unpublished,
}

/// Result record for one reconciled (product, variant, inventory item)
/// triple.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub product_id: i64,
    pub handle: String,
    pub in_stock: bool,
    pub action: ReconcileAction,
}

/// Reconcile one product's visibility and redirect state against current
/// inventory.
///
/// Returns `Ok(None)` when there is nothing to do: the product no longer
/// exists upstream, or its handle is not a used listing. Running this twice
/// with unchanged inventory lands in the same terminal state: the publish
/// write is an absolute value, the redirect create/delete pair is guarded by
/// a lookup.
///
/// Concurrent invocations for the same product are not serialized here; both
/// converge when the underlying inventory is stable, and interleaved
/// redirect create/delete pairs are an accepted race for the callers.
///
/// # Errors
///
/// Propagates product-fetch, inventory-lookup, and publish-write failures.
#[instrument(skip(client))]
pub async fn reconcile(
    client: &RestClient,
    inventory_item_id: i64,
    variant_id: i64,
    product_id: i64,
) -> Result<Option<ReconcileOutcome>, ShopifyError> {
    let Some(product) = products::product_by_id(client, product_id).await? else {
        info!(product_id, "product gone upstream, nothing to reconcile");
        return Ok(None);
    };

    if !products::is_used_handle(&product.handle) {
        debug!(handle = %product.handle, "not a used listing, skipping");
        return Ok(None);
    }

    let in_stock = inventory::is_in_stock(client, variant_id, inventory_item_id).await?;
    let canonical = products::new_handle_from_used(&product.handle).to_string();

    if in_stock {
        products::set_publish_status(client, product_id, true).await?;
        info!(handle = %product.handle, "published used listing, back in stock");

        if let Some(existing) = redirects::find_by_path(client, &product.handle).await {
            redirects::delete(client, existing.id).await;
        }
    } else {
        products::set_publish_status(client, product_id, false).await?;
        info!(handle = %product.handle, "unpublished used listing, out of stock");

        if redirects::find_by_path(client, &product.handle).await.is_none() {
            redirects::create(client, &product.handle, &canonical).await;
        }
    }

    Ok(Some(ReconcileOutcome {
        product_id,
        handle: product.handle,
        in_stock,
        action: if in_stock {
            ReconcileAction::Published
        } else {
            ReconcileAction::Unpublished
        },
    }))
}
