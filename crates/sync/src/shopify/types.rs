//! Wire types for the Admin REST resources the sync service touches.
//!
//! Every struct mirrors the JSON envelope Shopify returns: single resources
//! arrive wrapped (`{"product": {...}}`), listings arrive as arrays
//! (`{"products": [...]}`). Fields the service never reads are left off; serde
//! ignores unknown fields by default.

use serde::{Deserialize, Serialize};

/// A catalog product. Visibility is carried entirely by `published_at`:
/// present means live on the online store, `null` means hidden.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub handle: String,
    pub published_at: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Whether the product is currently visible on the storefront.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// A product variant; `inventory_item_id` links it to its tracked unit.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub inventory_item_id: i64,
}

/// Availability of one inventory item at one location.
///
/// `available` is nullable on the wire (untracked items); treat `null` the
/// same as zero.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevel {
    pub inventory_item_id: i64,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub available: Option<i64>,
}

impl InventoryLevel {
    /// Whether this level represents sellable stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        matches!(self.available, Some(n) if n > 0)
    }
}

/// A URL redirect. Paths are site-absolute (`/products/<handle>`).
#[derive(Debug, Clone, Deserialize)]
pub struct Redirect {
    pub id: i64,
    pub path: String,
    pub target: String,
}

/// Body for `POST redirects.json`.
#[derive(Debug, Serialize)]
pub struct NewRedirect<'a> {
    pub path: String,
    pub target: String,
    pub redirect_type: &'a str,
}

// =============================================================================
// Envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

#[derive(Debug, Deserialize)]
pub struct ProductsPage {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct VariantsPage {
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryLevelsPage {
    #[serde(default)]
    pub inventory_levels: Vec<InventoryLevel>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectEnvelope {
    pub redirect: Redirect,
}

#[derive(Debug, Deserialize)]
pub struct RedirectsPage {
    #[serde(default)]
    pub redirects: Vec<Redirect>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_envelope_deserializes() {
        let body = json!({
            "product": {
                "id": 632_910_392,
                "title": "The Left Hand of Darkness (Used - Good)",
                "handle": "left-hand-of-darkness-used-good",
                "published_at": "2025-03-01T09:00:00-05:00",
                "variants": [
                    {"id": 808_950_810, "product_id": 632_910_392, "inventory_item_id": 39_072_856}
                ]
            }
        });

        let envelope: ProductEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.product.handle, "left-hand-of-darkness-used-good");
        assert!(envelope.product.is_published());
        assert_eq!(envelope.product.variants.len(), 1);
        assert_eq!(envelope.product.variants[0].inventory_item_id, 39_072_856);
    }

    #[test]
    fn test_unpublished_product() {
        let body = json!({"id": 1, "handle": "x", "published_at": null});
        let product: Product = serde_json::from_value(body).unwrap();
        assert!(!product.is_published());
        assert!(product.variants.is_empty());
    }

    #[test]
    fn test_inventory_level_in_stock() {
        let level: InventoryLevel = serde_json::from_value(json!({
            "inventory_item_id": 1, "location_id": 2, "available": 3
        }))
        .unwrap();
        assert!(level.in_stock());

        let level: InventoryLevel = serde_json::from_value(json!({
            "inventory_item_id": 1, "available": 0
        }))
        .unwrap();
        assert!(!level.in_stock());

        // Untracked items report null availability; never sellable.
        let level: InventoryLevel = serde_json::from_value(json!({
            "inventory_item_id": 1, "available": null
        }))
        .unwrap();
        assert!(!level.in_stock());
    }

    #[test]
    fn test_empty_listing_envelopes() {
        let page: InventoryLevelsPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.inventory_levels.is_empty());

        let page: RedirectsPage = serde_json::from_value(json!({"redirects": []})).unwrap();
        assert!(page.redirects.is_empty());
    }
}
