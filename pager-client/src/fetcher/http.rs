//! HTTP fetcher for the items REST API.
//!
//! Requests `GET {base}/items/?page={n}`, adding `search={query}` for a
//! non-empty query, and decodes `{count, next, previous, results}`.

use super::PageFetcher;
use crate::error::PagerError;
use async_trait::async_trait;
use pager_types::{FetchError, ItemPageResponse, PageNumber, PageResult, Query};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

/// Fetches item pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    items_url: Url,
}

impl HttpFetcher {
    /// Create a fetcher for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PagerError> {
        let items_url = Self::items_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PagerError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self { client, items_url })
    }

    fn items_url(base_url: &str) -> Result<Url, PagerError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| PagerError::InvalidConfig(format!("base url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(PagerError::InvalidConfig(format!(
                "base url {base_url:?} is not an http(s) url"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("items/")
            .map_err(|e| PagerError::InvalidConfig(format!("base url {base_url:?}: {e}")))
    }

    /// URL requested for `page` of `query`.
    pub fn page_url(&self, page: PageNumber, query: &Query) -> Url {
        let mut url = self.items_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if !query.is_all() {
                pairs.append_pair("search", query.as_str());
            }
            pairs.append_pair("page", &page.to_string());
        }
        url
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, page: PageNumber, query: &Query) -> Result<PageResult, FetchError> {
        let url = self.page_url(page, query);
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let decoded = ItemPageResponse::from_json(&bytes)?;
        Ok(decoded.into())
    }
}
