//! Shopify Admin REST API client (HIGH PRIVILEGE).
//!
//! # Architecture
//!
//! - Plain REST calls via `reqwest` against the versioned Admin API
//! - Typed request descriptors ([`ApiRequest`]) instead of ad-hoc path/params
//! - Rate limiting (HTTP 429 + `Retry-After`) retried inside the client with
//!   a bounded attempt count and elapsed-time budget
//! - Cacheable GET families (product detail, inventory levels, redirect
//!   listing) served from per-family `moka` caches, invalidated eagerly by
//!   any mutation touching the same family
//! - Pagination cursors lifted from the `Link` response header, never built
//!   locally
//!
//! # Example
//!
//! ```rust,ignore
//! use dogear_sync::shopify::{ApiRequest, RestClient};
//!
//! let client = RestClient::new(&config.shopify);
//!
//! let page = client
//!     .send(ApiRequest::get("products.json").query("limit", "250"))
//!     .await?;
//! ```

mod client;
pub mod types;

pub use client::{ApiRequest, ApiResponse, PageCursor, ResourceFamily, RestClient};

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP transport failed (DNS, connect, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Rate limited by Shopify. Consumed by the client's backoff loop and
    /// never returned from `send`; once the retry budget is exhausted the
    /// terminal 429 surfaces as [`ShopifyError::Api`] instead.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-requested pause before re-issuing the request.
        retry_after: Duration,
    },

    /// Non-2xx, non-429 response (includes not-found and validation errors).
    #[error("Shopify API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog scan hit its page-request ceiling with results remaining.
    #[error("catalog scan stopped after {pages} page requests with pages remaining")]
    CircuitBreaker {
        /// Page requests consumed before the breaker tripped.
        pages: u32,
    },
}

impl ShopifyError {
    /// Whether this error is a not-found API response.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
