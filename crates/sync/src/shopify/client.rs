//! REST client for the Shopify Admin API.
//!
//! Single point of contact with the external platform: authentication,
//! bounded rate-limit retries, pagination cursor extraction, and the
//! per-family response cache all live here so callers see one
//! `send(request) -> response` surface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use secrecy::ExposeSecret;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ShopifyConfig;

use super::ShopifyError;

/// Maximum 429 retries for a single request before escalating.
const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Elapsed-time ceiling across all retries of a single request.
const RATE_LIMIT_BUDGET: Duration = Duration::from_secs(60);

/// Pause used when a 429 carries no parsable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Per-family cache capacity.
const CACHE_CAPACITY: u64 = 1000;

/// Opaque continuation token from the `Link` response header.
///
/// Valid for exactly one follow-up request; never construct one except from
/// [`ApiResponse::next_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// The raw `page_info` value to pass back as a query parameter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resource family a request belongs to, for cache keying and invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFamily {
    Product,
    Inventory,
    Redirect,
}

impl ResourceFamily {
    /// Classify a resource path. Paths outside the three known families
    /// (e.g., `shop.json`) return `None` and are never cached or tracked
    /// for invalidation.
    #[must_use]
    pub fn of_path(path: &str) -> Option<Self> {
        if path == "products.json" || path.starts_with("products/") {
            Some(Self::Product)
        } else if path == "inventory_levels.json" || path.starts_with("inventory_levels/") {
            Some(Self::Inventory)
        } else if path == "redirects.json" || path.starts_with("redirects/") {
            Some(Self::Redirect)
        } else if path == "variants.json" || path.starts_with("variants/") {
            // Variants hang off products; a product mutation stales them.
            Some(Self::Product)
        } else {
            None
        }
    }

    /// Families whose cached reads a mutation of `self` makes stale.
    ///
    /// A product write moves publish state that inventory-derived reads key
    /// off, so it sweeps both; redirect writes touch only redirects.
    #[must_use]
    pub const fn invalidates(self) -> &'static [Self] {
        match self {
            Self::Product => &[Self::Product, Self::Inventory],
            Self::Inventory => &[Self::Inventory],
            Self::Redirect => &[Self::Redirect],
        }
    }
}

/// Typed descriptor for one Admin API call.
///
/// Replaces stringly paths-with-optional-params: the method, resource path,
/// query pairs, and JSON body travel together and the client derives cache
/// identity from them.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// GET `path` (relative to the versioned API root, e.g. `products.json`).
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// POST `path` with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// PUT `path` with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// DELETE `path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// The resource family this request touches, if any.
    #[must_use]
    pub fn family(&self) -> Option<ResourceFamily> {
        ResourceFamily::of_path(&self.path)
    }

    /// Family to serve this request from cache, or `None` to bypass.
    ///
    /// Only three GET shapes are cacheable: product detail, inventory
    /// levels, and the redirect listing. The `products.json` listing is
    /// deliberately excluded so catalog scans always observe live state.
    fn cacheable_family(&self) -> Option<ResourceFamily> {
        if self.method != Method::GET {
            return None;
        }
        if (self.path.starts_with("products/") && self.path.ends_with(".json"))
            || self.path == "inventory_levels.json"
            || self.path == "redirects.json"
        {
            self.family()
        } else {
            None
        }
    }

    /// Cache identity: normalized path plus sorted query pairs, so parameter
    /// order never splits or aliases entries.
    fn cache_key(&self) -> String {
        let mut pairs = self.query.clone();
        pairs.sort();
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }

    fn is_mutation(&self) -> bool {
        self.method != Method::GET
    }
}

/// Decoded response from one Admin API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code (always 2xx; failures become errors).
    pub status: u16,
    /// Decoded JSON body; `Null` for empty bodies (e.g., redirect deletes).
    pub body: serde_json::Value,
    /// Continuation token for the next page, when the response is paginated
    /// and more pages exist.
    pub next_page: Option<PageCursor>,
}

/// Shopify Admin REST API client.
///
/// Cheap to clone; all clones share one HTTP connection pool and one set of
/// response caches.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    http: reqwest::Client,
    base_url: String,
    products: Cache<String, ApiResponse>,
    inventory: Cache<String, ApiResponse>,
    redirects: Cache<String, ApiResponse>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a new client from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the access token contains invalid header characters.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        Self::from_base_url(
            config.base_url(),
            config.access_token.expose_secret(),
            config.cache_ttl,
        )
    }

    /// Create a client against an explicit base URL.
    ///
    /// Used by integration tests and local development to point the client
    /// at a mock endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the access token contains invalid header characters.
    #[must_use]
    pub fn from_base_url(
        base_url: impl Into<String>,
        access_token: &str,
        cache_ttl: Duration,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Shopify-Access-Token",
            HeaderValue::from_str(access_token).expect("Invalid access token for header"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        let build_cache = || {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(cache_ttl)
                .build()
        };

        Self {
            inner: Arc::new(RestClientInner {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                products: build_cache(),
                inventory: build_cache(),
                redirects: build_cache(),
            }),
        }
    }

    /// Send one request, honoring the cache and the rate-limit policy.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::Transport`] when the request never got a response
    /// - [`ShopifyError::Api`] for any non-2xx, non-429 status, and for 429
    ///   once the retry budget is exhausted
    /// - [`ShopifyError::Parse`] when a 2xx body is not valid JSON
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ShopifyError> {
        if let Some(family) = request.cacheable_family() {
            let key = request.cache_key();
            if let Some(hit) = self.cache_for(family).get(&key).await {
                debug!("cache hit");
                return Ok(hit);
            }

            let response = self.execute_with_backoff(&request).await?;
            self.cache_for(family).insert(key, response.clone()).await;
            return Ok(response);
        }

        let response = self.execute_with_backoff(&request).await?;

        // A write makes prior reads of the touched families stale; drop them
        // before the same reconciliation reads again.
        if request.is_mutation()
            && let Some(family) = request.family()
        {
            for invalidated in family.invalidates() {
                self.cache_for(*invalidated).invalidate_all();
            }
            debug!(family = ?family, "invalidated cached reads after mutation");
        }

        Ok(response)
    }

    /// Issue the request, absorbing 429s with bounded re-issue.
    ///
    /// Each 429 re-reads a fresh `Retry-After`; the loop gives up once it has
    /// retried [`MAX_RATE_LIMIT_RETRIES`] times or the next sleep would blow
    /// the elapsed-time budget, and reports the terminal 429 as an API error.
    async fn execute_with_backoff(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ShopifyError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            match self.dispatch(request).await {
                Ok(response) => return Ok(response),
                Err(ShopifyError::RateLimited { retry_after }) => {
                    attempts += 1;
                    if attempts > MAX_RATE_LIMIT_RETRIES
                        || started.elapsed() + retry_after > RATE_LIMIT_BUDGET
                    {
                        return Err(ShopifyError::Api {
                            status: 429,
                            message: format!(
                                "rate limit retry budget exhausted after {attempts} attempts"
                            ),
                        });
                    }
                    warn!(
                        attempt = attempts,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "rate limited, pausing before retry"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// One HTTP round trip; no retries, no cache.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ShopifyError> {
        let url = format!("{}/{}", self.inner.base_url, request.path);

        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(ShopifyError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let next_page = next_page_cursor(response.headers());

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
            next_page,
        })
    }

    fn cache_for(&self, family: ResourceFamily) -> &Cache<String, ApiResponse> {
        match family {
            ResourceFamily::Product => &self.inner.products,
            ResourceFamily::Inventory => &self.inner.inventory,
            ResourceFamily::Redirect => &self.inner.redirects,
        }
    }
}

/// Parse a `Retry-After` value as (possibly fractional) seconds.
///
/// Shopify sends decimals like `2.0`. Negative and non-numeric values are
/// ignored so a misbehaving upstream cannot stall or crash the retry loop.
fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let seconds: f64 = header_value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds))
}

/// Extract the `page_info` continuation token from a `Link` header.
///
/// Shopify's pagination header looks like:
///
/// ```text
/// <https://shop.myshopify.com/admin/api/2025-01/products.json?page_info=abc&limit=250>; rel="next"
/// ```
///
/// possibly alongside a `rel="previous"` entry. Only the `next` link matters
/// here; anything unparsable yields `None` (treated as the last page).
fn next_page_cursor(headers: &HeaderMap) -> Option<PageCursor> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',')
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| {
            let target = part.split(';').next()?.trim();
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            let url = Url::parse(target).ok()?;
            url.query_pairs()
                .find(|(key, _)| key == "page_info")
                .map(|(_, value)| PageCursor(value.into_owned()))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn header_map(link: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(link).unwrap());
        headers
    }

    #[test]
    fn test_next_page_cursor_extracted() {
        let headers = header_map(
            "<https://shop.myshopify.com/admin/api/2025-01/products.json?page_info=eyJsYXN0X2lkIjo0fQ&limit=250>; rel=\"next\"",
        );
        let cursor = next_page_cursor(&headers).unwrap();
        assert_eq!(cursor.as_str(), "eyJsYXN0X2lkIjo0fQ");
    }

    #[test]
    fn test_next_page_cursor_skips_previous() {
        let headers = header_map(
            "<https://shop.myshopify.com/admin/api/2025-01/products.json?page_info=prev&limit=250>; rel=\"previous\", \
             <https://shop.myshopify.com/admin/api/2025-01/products.json?page_info=next-token&limit=250>; rel=\"next\"",
        );
        let cursor = next_page_cursor(&headers).unwrap();
        assert_eq!(cursor.as_str(), "next-token");
    }

    #[test]
    fn test_next_page_cursor_absent_on_last_page() {
        let headers = header_map(
            "<https://shop.myshopify.com/admin/api/2025-01/products.json?page_info=prev>; rel=\"previous\"",
        );
        assert!(next_page_cursor(&headers).is_none());
        assert!(next_page_cursor(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_parse_retry_after_decimal_seconds() {
        assert_eq!(
            parse_retry_after("2.0"),
            Some(Duration::from_secs_f64(2.0))
        );
        assert_eq!(parse_retry_after(" 1 "), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_parse_retry_after_rejects_garbage() {
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after("inf"), None);
    }

    #[test]
    fn test_resource_family_classification() {
        assert_eq!(
            ResourceFamily::of_path("products/123.json"),
            Some(ResourceFamily::Product)
        );
        assert_eq!(
            ResourceFamily::of_path("products.json"),
            Some(ResourceFamily::Product)
        );
        assert_eq!(
            ResourceFamily::of_path("variants.json"),
            Some(ResourceFamily::Product)
        );
        assert_eq!(
            ResourceFamily::of_path("inventory_levels.json"),
            Some(ResourceFamily::Inventory)
        );
        assert_eq!(
            ResourceFamily::of_path("redirects/42.json"),
            Some(ResourceFamily::Redirect)
        );
        assert_eq!(ResourceFamily::of_path("shop.json"), None);
    }

    #[test]
    fn test_invalidation_matrix() {
        assert_eq!(
            ResourceFamily::Product.invalidates(),
            &[ResourceFamily::Product, ResourceFamily::Inventory]
        );
        assert_eq!(
            ResourceFamily::Redirect.invalidates(),
            &[ResourceFamily::Redirect]
        );
    }

    #[test]
    fn test_cacheable_family_allow_list() {
        assert_eq!(
            ApiRequest::get("products/1.json").cacheable_family(),
            Some(ResourceFamily::Product)
        );
        assert_eq!(
            ApiRequest::get("inventory_levels.json").cacheable_family(),
            Some(ResourceFamily::Inventory)
        );
        assert_eq!(
            ApiRequest::get("redirects.json").cacheable_family(),
            Some(ResourceFamily::Redirect)
        );

        // Listings scanned for freshness and all mutations bypass the cache.
        assert_eq!(ApiRequest::get("products.json").cacheable_family(), None);
        assert_eq!(ApiRequest::get("variants.json").cacheable_family(), None);
        assert_eq!(
            ApiRequest::put("products/1.json", serde_json::Value::Null).cacheable_family(),
            None
        );
    }

    #[test]
    fn test_cache_key_normalizes_query_order() {
        let a = ApiRequest::get("redirects.json")
            .query("path", "/products/x")
            .query("limit", "250");
        let b = ApiRequest::get("redirects.json")
            .query("limit", "250")
            .query("path", "/products/x");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "redirects.json?limit=250&path=/products/x");
    }

    #[test]
    fn test_client_is_clone_send_sync() {
        fn assert_clone<T: Clone>() {}
        fn assert_send_sync<T: Send + Sync>() {}
        assert_clone::<RestClient>();
        assert_send_sync::<RestClient>();
    }
}
