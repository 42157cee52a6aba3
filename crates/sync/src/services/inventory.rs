//! Inventory availability lookups.
//!
//! The one rule here: an unknown stock state is out-of-stock. Absent,
//! empty, and shape-invalid inventory data all read as `false`; only
//! transport and API failures propagate, since without an observation the
//! caller has no decision to make.

use tracing::{instrument, warn};

use crate::shopify::types::{InventoryLevel, InventoryLevelsPage};
use crate::shopify::{ApiRequest, RestClient, ShopifyError};

/// Fetch the inventory level for a tracked item, `None` when the platform
/// has no record (or an unreadable one) for it.
///
/// # Errors
///
/// Returns transport and API failures. Body-shape mismatches are downgraded
/// to `Ok(None)`.
#[instrument(skip(client))]
pub async fn level_for_item(
    client: &RestClient,
    inventory_item_id: i64,
) -> Result<Option<InventoryLevel>, ShopifyError> {
    let request = ApiRequest::get("inventory_levels.json")
        .query("inventory_item_ids", inventory_item_id.to_string());

    let response = client.send(request).await?;

    match serde_json::from_value::<InventoryLevelsPage>(response.body) {
        Ok(page) => {
            if page.inventory_levels.is_empty() {
                warn!(inventory_item_id, "no inventory data returned for item");
            }
            Ok(page.inventory_levels.into_iter().next())
        }
        Err(err) => {
            warn!(
                inventory_item_id,
                error = %err,
                "malformed inventory response, treating as unknown"
            );
            Ok(None)
        }
    }
}

/// Whether a variant's tracked item currently has sellable stock.
///
/// Unknown availability reads as out-of-stock.
///
/// # Errors
///
/// Returns transport and API failures; reconciliation for this unit cannot
/// proceed without an answer.
#[instrument(skip(client))]
pub async fn is_in_stock(
    client: &RestClient,
    variant_id: i64,
    inventory_item_id: i64,
) -> Result<bool, ShopifyError> {
    match level_for_item(client, inventory_item_id).await? {
        Some(level) => Ok(level.in_stock()),
        None => {
            warn!(
                variant_id,
                inventory_item_id, "could not determine inventory, assuming out of stock"
            );
            Ok(false)
        }
    }
}
