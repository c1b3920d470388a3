//! Remote page fetchers.
//!
//! The paging coordinator only needs one call: fetch page `n` for a query.
//! [`HttpFetcher`] talks to the items REST API; [`MockFetcher`] serves an
//! in-memory catalogue for tests and offline demos.
//!
//! Fetchers never retry. A failed fetch is reported once and the consumer
//! decides whether to retry.

mod http;
mod mock;

pub use http::HttpFetcher;
pub use mock::{FetchRequest, MockFetcher};

use async_trait::async_trait;
use pager_types::{FetchError, PageNumber, PageResult, Query};
use std::sync::Arc;

/// Source of remote pages.
#[async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    /// Fetch one page of items for `query`.
    ///
    /// An empty result means there are no more pages in that direction.
    async fn fetch(&self, page: PageNumber, query: &Query) -> Result<PageResult, FetchError>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch(&self, page: PageNumber, query: &Query) -> Result<PageResult, FetchError> {
        (**self).fetch(page, query).await
    }
}
