//! Paginated catalog scan for used listings.
//!
//! Walks `products.json` cursor by cursor, yielding only products whose
//! handle matches the used-listing convention. The scan is lazy (nothing is
//! fetched until polled) and restartable (each call to [`CatalogScanner::scan`]
//! starts from the first page).

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tracing::{debug, info, warn};

use crate::shopify::types::{Product, ProductsPage};
use crate::shopify::{ApiRequest, PageCursor, RestClient, ShopifyError};

use super::products::is_used_handle;

/// Products requested per page (Shopify's maximum).
const PAGE_LIMIT: u32 = 250;

/// Ceiling on page requests per scan. A catalog needing more pages than this
/// indicates a cycling cursor or runaway growth; the scan stops and reports
/// rather than looping forever.
const MAX_PAGE_REQUESTS: u32 = 100;

/// Courtesy pause between page requests, independent of rate-limit status.
const PAGE_DELAY: Duration = Duration::from_millis(100);

/// Scans the catalog for used listings across all pages.
pub struct CatalogScanner<'a> {
    client: &'a RestClient,
    max_requests: u32,
    page_delay: Duration,
}

impl<'a> CatalogScanner<'a> {
    /// Scanner with production limits (250/page, 100 pages, 100 ms pause).
    #[must_use]
    pub const fn new(client: &'a RestClient) -> Self {
        Self {
            client,
            max_requests: MAX_PAGE_REQUESTS,
            page_delay: PAGE_DELAY,
        }
    }

    /// Scanner with explicit limits, for tests and one-off tooling.
    #[must_use]
    pub const fn with_limits(
        client: &'a RestClient,
        max_requests: u32,
        page_delay: Duration,
    ) -> Self {
        Self {
            client,
            max_requests,
            page_delay,
        }
    }

    /// Lazily yield every used listing in the catalog.
    ///
    /// Pages until a page comes back empty or without a continuation cursor.
    /// Hitting the request ceiling yields a final
    /// [`ShopifyError::CircuitBreaker`] carrying how many pages were
    /// consumed; the items already yielded remain valid. A 429 mid-scan is
    /// retried inside the client against the same cursor, so no page is
    /// skipped or fetched twice on its account.
    pub fn scan(&self) -> impl Stream<Item = Result<Product, ShopifyError>> + '_ {
        stream! {
            let mut cursor: Option<PageCursor> = None;
            let mut pages: u32 = 0;

            loop {
                if pages >= self.max_requests {
                    warn!(
                        pages,
                        "page-request ceiling reached with pages remaining, stopping scan"
                    );
                    yield Err(ShopifyError::CircuitBreaker { pages });
                    return;
                }

                if pages > 0 {
                    tokio::time::sleep(self.page_delay).await;
                }

                let mut request = ApiRequest::get("products.json")
                    .query("limit", PAGE_LIMIT.to_string());
                if let Some(cursor) = &cursor {
                    request = request.query("page_info", cursor.as_str());
                }

                let response = match self.client.send(request).await {
                    Ok(response) => response,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                pages += 1;

                let page: ProductsPage = match serde_json::from_value(response.body) {
                    Ok(page) => page,
                    Err(err) => {
                        yield Err(err.into());
                        return;
                    }
                };

                if page.products.is_empty() {
                    debug!(pages, "empty page, scan complete");
                    break;
                }

                let next = response.next_page;
                let total = page.products.len();
                let mut matched = 0usize;

                for product in page.products {
                    if is_used_handle(&product.handle) {
                        matched += 1;
                        yield Ok(product);
                    }
                }
                debug!(page = pages, total, matched, "scanned page");

                match next {
                    Some(next_cursor) => cursor = Some(next_cursor),
                    None => break,
                }
            }

            info!(pages, "catalog scan finished");
        }
    }
}
