//! Product reads, publish-state writes, and the used-listing handle
//! convention.
//!
//! A used listing's handle is the canonical handle plus `-used-<grade>`,
//! where the grade is one of a closed set of condition tokens
//! (`left-hand-of-darkness-used-very-good` pairs with
//! `left-hand-of-darkness`). The convention is the only thing that marks a
//! product as a used listing; nothing is stored.

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::shopify::types::{Product, ProductEnvelope};
use crate::shopify::{ApiRequest, RestClient, ShopifyError};

/// Marker separating the canonical handle from the condition grade.
const USED_MARKER: &str = "-used-";

/// Closed set of condition grades the store lists used copies under.
const CONDITION_GRADES: &[&str] = &["like-new", "very-good", "good", "acceptable"];

/// Whether a handle follows the used-listing convention.
#[must_use]
pub fn is_used_handle(handle: &str) -> bool {
    handle
        .rfind(USED_MARKER)
        .map(|idx| idx + USED_MARKER.len())
        .is_some_and(|grade_start| {
            handle
                .get(grade_start..)
                .is_some_and(|grade| CONDITION_GRADES.contains(&grade))
        })
}

/// The canonical (new-copy) handle for a used-listing handle.
///
/// Truncates at the first marker occurrence, so a canonical handle that
/// itself contains the marker round-trips wrong; the catalog does not
/// produce such handles.
#[must_use]
pub fn new_handle_from_used(handle: &str) -> &str {
    handle
        .find(USED_MARKER)
        .and_then(|idx| handle.get(..idx))
        .unwrap_or(handle)
}

/// Fetch a product by id. `Ok(None)` when the product no longer exists
/// upstream (deleted listings are routine, not an error).
///
/// # Errors
///
/// Returns any non-404 API failure, transport failure, or body-shape
/// mismatch.
#[instrument(skip(client))]
pub async fn product_by_id(
    client: &RestClient,
    product_id: i64,
) -> Result<Option<Product>, ShopifyError> {
    let request = ApiRequest::get(format!("products/{product_id}.json"));

    match client.send(request).await {
        Ok(response) => {
            let envelope: ProductEnvelope = serde_json::from_value(response.body)?;
            Ok(Some(envelope.product))
        }
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Publish or hide a product by writing its `published_at` timestamp.
///
/// The write is an absolute timestamp (or null), not a delta, so repeating
/// it converges on the same state.
///
/// # Errors
///
/// Returns any API or transport failure; publish-state writes are the one
/// side effect reconciliation cannot proceed without.
#[instrument(skip(client))]
pub async fn set_publish_status(
    client: &RestClient,
    product_id: i64,
    publish: bool,
) -> Result<Product, ShopifyError> {
    let published_at = publish.then(|| Utc::now().to_rfc3339());

    let request = ApiRequest::put(
        format!("products/{product_id}.json"),
        json!({
            "product": {
                "id": product_id,
                "published_at": published_at,
            }
        }),
    );

    let response = client.send(request).await?;
    let envelope: ProductEnvelope = serde_json::from_value(response.body)?;
    Ok(envelope.product)
}
