//! End-to-end paging tests: a pager over an in-memory cache and a mock
//! page source, driven through its streams.

use offline_pager_client::{
    InitialRefresh, MockFetcher, PagedStream, Pager, PagerConfig, WindowSnapshot,
};
use pager_core::{cursors_for_page, LoadFailure};
use pager_store::{ItemCache, NameFilter, PageMerge, PagingStore, SqliteStore};
use pager_types::{FetchError, Item, PageNumber, Query};
use std::time::Duration;

const PAGE: usize = 10;

fn catalogue(n: i64) -> Vec<Item> {
    (1..=n).map(|i| Item::new(i, format!("item-{:03}", i))).collect()
}

async fn pager_with(
    catalogue: Vec<Item>,
    config: PagerConfig,
) -> (Pager<MockFetcher, SqliteStore>, MockFetcher) {
    let fetcher = MockFetcher::new(catalogue, PAGE);
    let store = SqliteStore::in_memory().await.unwrap();
    let pager = Pager::new(config, fetcher.clone(), store).unwrap();
    (pager, fetcher)
}

fn config() -> PagerConfig {
    PagerConfig::new().with_page_size(PAGE)
}

/// Seed the cache as if `items` had arrived as network page `page`.
async fn seed(store: &SqliteStore, items: Vec<Item>, page: u32) {
    store
        .merge_page(PageMerge {
            clear_first: false,
            cursors: cursors_for_page(&items, PageNumber::new(page), PageNumber::FIRST),
            items,
        })
        .await
        .unwrap();
}

async fn wait_until(
    stream: &mut PagedStream,
    predicate: impl Fn(&WindowSnapshot) -> bool,
) -> WindowSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        if let Some(snapshot) = stream.latest() {
            if predicate(&snapshot) {
                return snapshot;
            }
        }
        loop {
            let snapshot = stream.next().await.expect("stream closed");
            if predicate(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("condition never reached")
}

async fn wait_for_requests(fetcher: &MockFetcher, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while fetcher.requests().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("fetch was never issued");
}

fn settled_with(len: usize) -> impl Fn(&WindowSnapshot) -> bool {
    move |s| !s.load_states.is_loading() && s.total == len
}

// ===========================================
// Initial load
// ===========================================

#[tokio::test]
async fn stream_refreshes_first_page_on_open() {
    let (pager, fetcher) = pager_with(catalogue(45), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;

    let snapshot = wait_until(&mut stream, settled_with(10)).await;

    assert_eq!(snapshot.items, catalogue(10));
    assert_eq!(snapshot.offset, 0);
    assert!(!snapshot.is_empty_result());
    assert_eq!(fetcher.requested_pages(), vec![1]);
}

#[tokio::test]
async fn skipped_refresh_shows_cached_items_offline() {
    let (pager, fetcher) = pager_with(
        catalogue(45),
        config().with_initial_refresh(InitialRefresh::Skip),
    )
    .await;
    seed(pager.store(), catalogue(3), 1).await;

    let mut stream = pager.open_stream(Query::all()).await;
    let snapshot = wait_until(&mut stream, settled_with(3)).await;

    assert_eq!(snapshot.items, catalogue(3));
    assert!(fetcher.requests().is_empty());

    stream.refresh();
    wait_until(&mut stream, settled_with(10)).await;
    assert_eq!(fetcher.requested_pages(), vec![1]);
}

#[tokio::test]
async fn empty_source_reports_empty_result() {
    let (pager, _fetcher) = pager_with(Vec::new(), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;

    let snapshot = wait_until(&mut stream, |s| s.load_states.is_exhausted_at_end()).await;

    assert!(snapshot.is_empty_result());
    assert!(snapshot.load_states.is_exhausted_at_start());
}

// ===========================================
// Scrolling
// ===========================================

#[tokio::test]
async fn scrolling_to_the_end_appends_next_page() {
    let (pager, fetcher) = pager_with(catalogue(45), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;
    let first = wait_until(&mut stream, settled_with(10)).await;

    stream.access(first.last_index().unwrap());
    let snapshot = wait_until(&mut stream, settled_with(20)).await;

    assert_eq!(snapshot.items, catalogue(20));
    assert_eq!(fetcher.requested_pages(), vec![1, 2]);
    assert!(snapshot.load_states.is_exhausted_at_start());
    assert!(!snapshot.load_states.is_exhausted_at_end());
}

#[tokio::test]
async fn empty_page_exhausts_the_end() {
    let (pager, fetcher) = pager_with(catalogue(15), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;
    wait_until(&mut stream, settled_with(10)).await;

    stream.access(9);
    wait_until(&mut stream, settled_with(15)).await;
    stream.access(14);
    let snapshot = wait_until(&mut stream, |s| s.load_states.is_exhausted_at_end()).await;

    assert_eq!(snapshot.items, catalogue(15));
    assert_eq!(fetcher.requested_pages(), vec![1, 2, 3]);
}

#[tokio::test]
async fn window_grows_from_cache_before_the_network() {
    let (pager, fetcher) = pager_with(
        catalogue(50),
        config().with_initial_refresh(InitialRefresh::Skip),
    )
    .await;
    for page in 0..5u32 {
        let items = catalogue(50)[page as usize * PAGE..(page as usize + 1) * PAGE].to_vec();
        seed(pager.store(), items, page + 1).await;
    }

    let mut stream = pager.open_stream(Query::all()).await;
    let initial = wait_until(&mut stream, settled_with(50)).await;
    assert_eq!(initial.items.len(), 30);

    stream.access(25);
    let grown = wait_until(&mut stream, |s| s.items.len() == 40).await;

    assert_eq!(grown.offset, 0);
    assert!(fetcher.requests().is_empty());
}

// ===========================================
// Failures
// ===========================================

#[tokio::test]
async fn failed_refresh_can_be_retried() {
    let (pager, fetcher) = pager_with(catalogue(45), config()).await;
    fetcher.fail_next(FetchError::Network("offline".into()));
    let mut stream = pager.open_stream(Query::all()).await;

    let failed = wait_until(&mut stream, |s| s.load_states.refresh.error().is_some()).await;
    assert_eq!(
        failed.load_states.refresh.error(),
        Some(&LoadFailure::Network("offline".into()))
    );
    assert!(failed.is_empty_result());

    stream.retry();
    let snapshot = wait_until(&mut stream, settled_with(10)).await;

    assert_eq!(snapshot.items, catalogue(10));
    assert_eq!(fetcher.requested_pages(), vec![1, 1]);
}

#[tokio::test]
async fn failed_append_keeps_cached_items_and_retries_same_page() {
    let (pager, fetcher) = pager_with(catalogue(45), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;
    wait_until(&mut stream, settled_with(10)).await;

    fetcher.fail_next(FetchError::Http {
        status: 500,
        body: "boom".into(),
    });
    stream.access(9);
    let failed = wait_until(&mut stream, |s| s.load_states.append.error().is_some()).await;
    assert_eq!(failed.items, catalogue(10));

    stream.retry();
    wait_until(&mut stream, settled_with(20)).await;
    assert_eq!(fetcher.requested_pages(), vec![1, 2, 2]);
}

#[tokio::test]
async fn retry_reissues_both_failed_boundaries() {
    let (pager, fetcher) = pager_with(
        catalogue(45),
        config().with_initial_refresh(InitialRefresh::Skip),
    )
    .await;
    seed(pager.store(), catalogue(20)[10..].to_vec(), 2).await;
    let mut stream = pager.open_stream(Query::all()).await;
    wait_until(&mut stream, settled_with(10)).await;

    fetcher.fail_next_n(2, FetchError::Network("offline".into()));
    stream.access(0);
    let failed = wait_until(&mut stream, |s| {
        s.load_states.prepend.error().is_some() && s.load_states.append.error().is_some()
    })
    .await;
    assert_eq!(failed.items, catalogue(20)[10..].to_vec());

    stream.retry();
    let snapshot = wait_until(&mut stream, settled_with(30)).await;

    assert!(snapshot.load_states.first_error().is_none());
    let mut pages = fetcher.requested_pages();
    pages.sort_unstable();
    assert_eq!(pages, vec![1, 1, 3, 3]);
}

// ===========================================
// Refresh during boundary loads
// ===========================================

#[tokio::test]
async fn refresh_aborts_running_append() {
    let (pager, fetcher) = pager_with(catalogue(50), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;
    wait_until(&mut stream, settled_with(10)).await;
    stream.access(9);
    wait_until(&mut stream, settled_with(20)).await;
    stream.access(19);
    wait_until(&mut stream, settled_with(30)).await;

    fetcher.pause();
    stream.access(29);
    wait_for_requests(&fetcher, 4).await;
    assert_eq!(fetcher.requested_pages(), vec![1, 2, 3, 4]);

    stream.access(0);
    stream.refresh();
    let refreshing = wait_until(&mut stream, |s| s.load_states.refresh.is_loading()).await;
    assert!(!refreshing.load_states.append.is_loading());
    wait_for_requests(&fetcher, 5).await;

    fetcher.resume();
    let refreshed = wait_until(&mut stream, settled_with(10)).await;
    assert_eq!(refreshed.items, catalogue(10));
    assert_eq!(fetcher.requested_pages(), vec![1, 2, 3, 4, 1]);

    // The held page 4 never lands, and paging resumes right after page 1.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let cached = pager
        .store()
        .load_items(&NameFilter::All, 0, 100)
        .await
        .unwrap();
    assert_eq!(cached, catalogue(10));

    stream.access(9);
    let snapshot = wait_until(&mut stream, settled_with(20)).await;
    assert_eq!(snapshot.items, catalogue(20));
    assert_eq!(fetcher.requested_pages(), vec![1, 2, 3, 4, 1, 2]);
}

// ===========================================
// Queries and cancellation
// ===========================================

#[tokio::test]
async fn search_stream_only_shows_matches() {
    let mut items = catalogue(20);
    items.extend((21..=25).map(|i| Item::new(i, format!("shoe-{:03}", i))));
    let (pager, fetcher) = pager_with(items, config()).await;

    let mut stream = pager.open_stream(Query::new("shoe")).await;
    let snapshot = wait_until(&mut stream, settled_with(5)).await;

    assert!(snapshot.items.iter().all(|i| i.name.starts_with("shoe-")));
    assert_eq!(fetcher.requests()[0].query, Query::new("shoe"));
}

#[tokio::test]
async fn switching_query_cancels_old_stream_and_replaces_cache() {
    let mut items = catalogue(20);
    items.extend((21..=25).map(|i| Item::new(i, format!("shoe-{:03}", i))));
    let (pager, _fetcher) = pager_with(items, config()).await;

    let mut all = pager.open_stream(Query::all()).await;
    wait_until(&mut all, settled_with(10)).await;

    let mut shoes = pager.open_stream(Query::new("shoe")).await;
    let snapshot = wait_until(&mut shoes, settled_with(5)).await;
    assert_eq!(snapshot.items.len(), 5);

    tokio::time::timeout(Duration::from_secs(5), async {
        while all.next().await.is_some() {}
    })
    .await
    .expect("old stream still running");

    let cached = pager
        .store()
        .load_items(&NameFilter::All, 0, 100)
        .await
        .unwrap();
    assert_eq!(cached.len(), 5);
    assert!(cached.iter().all(|i| i.name.starts_with("shoe-")));
}

#[tokio::test]
async fn dropping_stream_discards_in_flight_load() {
    let (pager, fetcher) = pager_with(catalogue(45), config()).await;
    fetcher.pause();

    let stream = pager.open_stream(Query::all()).await;
    wait_for_requests(&fetcher, 1).await;

    drop(stream);
    tokio::time::sleep(Duration::from_millis(50)).await;
    fetcher.resume();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(pager.store().stats().await.unwrap().items, 0);
}

#[tokio::test]
async fn cancelled_stream_yields_nothing() {
    let (pager, _fetcher) = pager_with(catalogue(5), config()).await;
    let mut stream = pager.open_stream(Query::all()).await;

    stream.cancel();

    assert!(stream.is_closed());
    assert!(stream.next().await.is_none());
}
