//! Path-redirect bookkeeping for hidden used listings.
//!
//! Every operation absorbs its own failures and returns a no-effect value
//! (`None`/`false`). Redirect state is advisory next to publish state: by
//! the time redirect work runs, the publish write has already landed, and
//! it must stand regardless of what happens here.

use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::shopify::types::{NewRedirect, Redirect, RedirectEnvelope, RedirectsPage};
use crate::shopify::{ApiRequest, RestClient};

/// Redirect type installed for hidden used listings. Temporary, so search
/// engines keep the used listing's URL indexed for when stock returns.
const REDIRECT_TYPE: &str = "302";

/// Find the redirect whose source is `/products/<handle>`, if one exists.
///
/// An empty result set and any failure both come back as `None`.
#[instrument(skip(client))]
pub async fn find_by_path(client: &RestClient, handle: &str) -> Option<Redirect> {
    let request = ApiRequest::get("redirects.json").query("path", format!("/products/{handle}"));

    let response = match client.send(request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(handle, error = %err, "redirect lookup failed");
            return None;
        }
    };

    match serde_json::from_value::<RedirectsPage>(response.body) {
        Ok(page) => page.redirects.into_iter().next(),
        Err(err) => {
            warn!(handle, error = %err, "malformed redirect listing");
            None
        }
    }
}

/// Create a 302 redirect from a used listing's path to its canonical
/// counterpart. Returns `None` on any failure.
///
/// Does not deduplicate; callers check [`find_by_path`] first and only
/// create when absent.
#[instrument(skip(client))]
pub async fn create(
    client: &RestClient,
    source_handle: &str,
    target_handle: &str,
) -> Option<Redirect> {
    let request = ApiRequest::post(
        "redirects.json",
        json!({
            "redirect": NewRedirect {
                path: format!("/products/{source_handle}"),
                target: format!("/products/{target_handle}"),
                redirect_type: REDIRECT_TYPE,
            }
        }),
    );

    let response = match client.send(request).await {
        Ok(response) => response,
        Err(err) => {
            error!(source_handle, target_handle, error = %err, "redirect create failed");
            return None;
        }
    };

    match serde_json::from_value::<RedirectEnvelope>(response.body) {
        Ok(envelope) => {
            info!(source_handle, target_handle, "created redirect");
            Some(envelope.redirect)
        }
        Err(err) => {
            warn!(source_handle, error = %err, "redirect created but response unreadable");
            None
        }
    }
}

/// Delete a redirect by id. Returns whether the delete took effect.
#[instrument(skip(client))]
pub async fn delete(client: &RestClient, redirect_id: i64) -> bool {
    let request = ApiRequest::delete(format!("redirects/{redirect_id}.json"));

    match client.send(request).await {
        Ok(_) => {
            info!(redirect_id, "deleted redirect");
            true
        }
        Err(err) => {
            error!(redirect_id, error = %err, "redirect delete failed");
            false
        }
    }
}
