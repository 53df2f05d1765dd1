//! Paginated endpoint walking.
//!
//! Continuation is signalled by the upstream `Link` header: a `rel="last"`
//! URL carries the final page number, which yields an estimated total item
//! count for progress reporting. Absence of the hint is not an error; the
//! walk then relies on empty- or short-page termination alone.

use async_trait::async_trait;
use octoharvest_types::Result;

use crate::client::ApiClient;
use crate::url::Endpoint;

/// One page of raw records from a collection endpoint.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number this page was fetched as.
    pub number: u32,
    /// Raw items in upstream order.
    pub items: Vec<serde_json::Value>,
    /// Estimated total item count across all pages, when the upstream
    /// supplied a `rel="last"` hint.
    pub estimated_total: Option<u64>,
}

impl Page {
    /// True if a walk should stop after this page: the page was empty or
    /// shorter than the requested page size.
    #[must_use]
    pub fn is_last(&self, per_page: usize) -> bool {
        self.items.len() < per_page
    }
}

/// Fetches numbered pages of one endpoint.
///
/// The engine's walks are written against this seam so tests can feed
/// synthetic pages; [`EndpointPager`] is the transport-backed
/// implementation. Each walk starts at page 1 and is not restartable.
#[async_trait]
pub trait PageFetcher {
    /// Fetches the given 1-based page.
    async fn fetch(&self, page: u32) -> Result<Page>;

    /// The fixed page size requested from the upstream.
    fn per_page(&self) -> usize;
}

/// [`PageFetcher`] over a live API endpoint.
#[derive(Debug)]
pub struct EndpointPager<'a> {
    client: &'a ApiClient,
    endpoint: Endpoint,
}

impl<'a> EndpointPager<'a> {
    /// Creates a pager for the given endpoint.
    #[must_use]
    pub const fn new(client: &'a ApiClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl PageFetcher for EndpointPager<'_> {
    async fn fetch(&self, page: u32) -> Result<Page> {
        let mut query = self.endpoint.query.clone();
        query.push(("page".to_string(), page.to_string()));
        query.push(("per_page".to_string(), self.endpoint.per_page.to_string()));

        let raw = self
            .client
            .get_page(&self.endpoint.path, &query, self.endpoint.accept)
            .await?;

        Ok(Page {
            number: page,
            items: raw.items,
            estimated_total: raw
                .last_page_hint
                .map(|last| u64::from(last) * self.endpoint.per_page as u64),
        })
    }

    fn per_page(&self) -> usize {
        self.endpoint.per_page
    }
}

/// Extracts the `rel="last"` page number from a `Link` header value.
///
/// Returns `None` when the header carries no usable hint; callers must
/// degrade to short-page termination, not fail.
#[must_use]
pub fn parse_last_page(link: &str) -> Option<u32> {
    for part in link.split(',') {
        let part = part.trim();
        if !part.contains(r#"rel="last""#) {
            continue;
        }

        let url = part.strip_prefix('<')?.split('>').next()?;
        let query = url.split_once('?')?.1;
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("page=") {
                return value.parse().ok();
            }
        }
    }
    None
}
