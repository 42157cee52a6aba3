//! Inbound Shopify webhook handling.
//!
//! Shopify signs each delivery with a base64 HMAC-SHA256 of the raw body in
//! the `X-Shopify-Hmac-Sha256` header. Verification runs against the raw
//! bytes before any JSON parsing.
//!
//! Once a delivery verifies, the handler always answers 200: a non-2xx
//! makes Shopify redeliver, and a reconciliation that failed here will be
//! picked up by the sweep anyway. Duplicated and reordered deliveries are
//! expected; reconciliation re-reads current state, so they converge.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info, instrument, warn};

use crate::error::AppError;
use crate::services::reconcile::reconcile;
use crate::shopify::types::VariantsPage;
use crate::shopify::{ApiRequest, RestClient, ShopifyError};
use crate::state::AppState;

/// Header carrying the webhook signature.
const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

/// `inventory_levels/update` payload; only the item id matters. The embedded
/// quantity is deliberately ignored; deliveries can arrive out of order, so
/// the engine re-fetches instead of trusting it.
#[derive(Debug, Deserialize)]
struct InventoryLevelPayload {
    inventory_item_id: Option<i64>,
}

/// Handle an `inventory_levels/update` delivery.
#[instrument(skip(state, headers, body))]
pub async fn inventory_levels(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let signature = headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;

    if !verify_signature(
        state.config().shopify.webhook_secret.expose_secret(),
        &body,
        signature,
    ) {
        warn!("webhook signature mismatch");
        return Err(AppError::Unauthorized(
            "invalid webhook signature".to_string(),
        ));
    }

    let payload: InventoryLevelPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "unreadable webhook payload");
            return Ok("ignored");
        }
    };

    let Some(inventory_item_id) = payload.inventory_item_id else {
        warn!("webhook payload missing inventory_item_id");
        return Ok("ignored");
    };

    info!(inventory_item_id, "received inventory webhook");

    // Errors past this point still answer 200: redelivery would not help,
    // and the sweep covers anything missed.
    match variant_for_item(state.shopify(), inventory_item_id).await {
        Ok(Some((variant_id, product_id))) => {
            match reconcile(state.shopify(), inventory_item_id, variant_id, product_id).await {
                Ok(Some(outcome)) => state.events().record(&outcome),
                Ok(None) => {}
                Err(err) => {
                    state.events().record_failure();
                    error!(
                        inventory_item_id,
                        product_id,
                        error = %err,
                        "webhook reconciliation failed"
                    );
                    sentry::capture_error(&err);
                }
            }
        }
        Ok(None) => {
            info!(inventory_item_id, "no variant for inventory item");
        }
        Err(err) => {
            error!(inventory_item_id, error = %err, "variant lookup failed");
            sentry::capture_error(&err);
        }
    }

    Ok("ok")
}

/// Resolve the variant (and its product) tracking an inventory item.
async fn variant_for_item(
    client: &RestClient,
    inventory_item_id: i64,
) -> Result<Option<(i64, i64)>, ShopifyError> {
    let request =
        ApiRequest::get("variants.json").query("inventory_item_ids", inventory_item_id.to_string());
    let response = client.send(request).await?;
    let page: VariantsPage = serde_json::from_value(response.body)?;

    Ok(page
        .variants
        .into_iter()
        .next()
        .map(|variant| (variant.id, variant.product_id)))
}

/// Verify a Shopify webhook signature (base64 HMAC-SHA256 of the raw body).
fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    constant_time_compare(&expected, signature)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        #[allow(clippy::unwrap_used)]
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let body = br#"{"inventory_item_id": 271878346596884000}"#;
        let signature = sign("test-secret", body);
        assert!(verify_signature("test-secret", body, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_wrong_secret() {
        let body = br#"{"inventory_item_id": 1}"#;
        let signature = sign("test-secret", body);
        assert!(!verify_signature("other-secret", body, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_tampered_body() {
        let signature = sign("test-secret", br#"{"inventory_item_id": 1}"#);
        assert!(!verify_signature(
            "test-secret",
            br#"{"inventory_item_id": 2}"#,
            &signature
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
