//! Mock fetcher for testing.
//!
//! Serves an in-memory catalogue, records every request, and can be told
//! to fail or to hold fetches until resumed.

use super::PageFetcher;
use async_trait::async_trait;
use pager_types::{FetchError, Item, PageNumber, PageResult, Query};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// One recorded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Requested page.
    pub page: PageNumber,
    /// Query it was requested for.
    pub query: Query,
}

/// In-memory page source.
///
/// Pages are consecutive slices of the catalogue, filtered the same loose
/// way the cache filters names: every whitespace-separated token of the
/// query must appear in order, ignoring ASCII case.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    inner: Arc<Mutex<MockFetcherInner>>,
    paused: Arc<watch::Sender<bool>>,
}

#[derive(Debug)]
struct MockFetcherInner {
    catalogue: Vec<Item>,
    page_size: usize,
    first_page: PageNumber,
    requests: Vec<FetchRequest>,
    failures: VecDeque<FetchError>,
}

impl MockFetcher {
    /// Create a fetcher serving `catalogue` in pages of `page_size`.
    pub fn new(catalogue: Vec<Item>, page_size: usize) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(MockFetcherInner {
                catalogue,
                page_size: page_size.max(1),
                first_page: PageNumber::FIRST,
                requests: Vec::new(),
                failures: VecDeque::new(),
            })),
            paused: Arc::new(paused),
        }
    }

    /// Number the first page `first_page` instead of 1.
    pub fn with_first_page(self, first_page: PageNumber) -> Self {
        self.lock().first_page = first_page;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockFetcherInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the catalogue.
    pub fn set_catalogue(&self, catalogue: Vec<Item>) {
        self.lock().catalogue = catalogue;
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.lock().requests.clone()
    }

    /// Pages requested so far, oldest first.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.lock().requests.iter().map(|r| r.page.value()).collect()
    }

    /// Fail the next fetch with `error`.
    pub fn fail_next(&self, error: FetchError) {
        self.lock().failures.push_back(error);
    }

    /// Fail the next `count` fetches with `error`.
    pub fn fail_next_n(&self, count: usize, error: FetchError) {
        let mut inner = self.lock();
        for _ in 0..count {
            inner.failures.push_back(error.clone());
        }
    }

    /// Hold every fetch after it is recorded until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Release held fetches.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Clear recorded requests and pending failures.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.requests.clear();
        inner.failures.clear();
    }

    fn page_of(inner: &MockFetcherInner, page: PageNumber, query: &Query) -> Vec<Item> {
        let Some(index) = page.value().checked_sub(inner.first_page.value()) else {
            return Vec::new();
        };
        inner
            .catalogue
            .iter()
            .filter(|item| matches_loosely(&item.name, query))
            .skip(index as usize * inner.page_size)
            .take(inner.page_size)
            .cloned()
            .collect()
    }
}

/// Whether every token of `query` appears in `name`, in order, ignoring
/// ASCII case.
fn matches_loosely(name: &str, query: &Query) -> bool {
    let name = name.to_ascii_lowercase();
    let mut rest = name.as_str();
    for token in query.as_str().split_whitespace() {
        let token = token.to_ascii_lowercase();
        match rest.find(&token) {
            Some(at) => rest = &rest[at + token.len()..],
            None => return false,
        }
    }
    true
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, page: PageNumber, query: &Query) -> Result<PageResult, FetchError> {
        self.lock().requests.push(FetchRequest {
            page,
            query: query.clone(),
        });

        let mut paused = self.paused.subscribe();
        // The sender is owned by self and cannot be dropped while we wait.
        let _ = paused.wait_for(|paused| !*paused).await;

        let mut inner = self.lock();
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        Ok(PageResult::new(Self::page_of(&inner, page, query)))
    }
}
