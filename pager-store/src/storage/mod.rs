//! Storage layer for pager-store.
//!
//! Provides the cursor store and item cache contracts, and the merge
//! operation that writes a fetched page into both atomically.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StorageError;
use crate::live::{LiveQuery, NameFilter};
use async_trait::async_trait;
use pager_types::{Item, ItemId, PageCursor};
use serde::Serialize;
use tokio::sync::watch;

/// Per-item page cursors.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Insert or replace cursors, keyed by item id.
    ///
    /// Every cursor must reference a cached item.
    async fn put_cursors(&self, cursors: &[PageCursor]) -> Result<(), StorageError>;

    /// Cursor recorded for an item, if any.
    async fn get_cursor(&self, item_id: ItemId) -> Result<Option<PageCursor>, StorageError>;

    /// Remove every cursor.
    async fn clear_cursors(&self) -> Result<(), StorageError>;

    /// Number of stored cursors.
    async fn cursor_count(&self) -> Result<usize, StorageError>;
}

/// Items ordered by name.
#[async_trait]
pub trait ItemCache: Send + Sync {
    /// Insert or replace items, keyed by id.
    async fn put_items(&self, items: &[Item]) -> Result<(), StorageError>;

    /// Remove every item, and with it every cursor.
    async fn clear_items(&self) -> Result<(), StorageError>;

    /// Point lookup by id.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StorageError>;

    /// Number of items matching `filter`.
    async fn count_items(&self, filter: &NameFilter) -> Result<usize, StorageError>;

    /// Up to `limit` items matching `filter`, sorted by name then id,
    /// skipping the first `offset`.
    async fn load_items(
        &self,
        filter: &NameFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Item>, StorageError>;

    /// Subscribe to the version counter bumped after every committed write.
    fn subscribe(&self) -> watch::Receiver<u64>;

    /// Bump the version counter, waking every live view.
    fn invalidate(&self);

    /// Live view of every item, sorted by name.
    fn query_all(&self) -> LiveQuery<Self>
    where
        Self: Clone + Sized,
    {
        LiveQuery::new(self.clone(), NameFilter::All)
    }

    /// Live view of the items whose name matches a `LIKE` pattern.
    fn query_by_name(&self, pattern: &str) -> LiveQuery<Self>
    where
        Self: Clone + Sized,
    {
        LiveQuery::new(self.clone(), NameFilter::Pattern(pattern.to_string()))
    }
}

/// One fetched page, ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMerge {
    /// Clear both tables before writing (refresh).
    pub clear_first: bool,
    /// Cursors for the fetched items.
    pub cursors: Vec<PageCursor>,
    /// The fetched items.
    pub items: Vec<Item>,
}

impl PageMerge {
    /// Whether the merge would change nothing.
    pub fn is_noop(&self) -> bool {
        !self.clear_first && self.cursors.is_empty() && self.items.is_empty()
    }
}

/// Row counts reported by `pager-cli status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Cached items.
    pub items: usize,
    /// Stored cursors.
    pub cursors: usize,
}

/// The store the paging coordinator writes into.
#[async_trait]
pub trait PagingStore: CursorStore + ItemCache + Clone + 'static {
    /// Write a fetched page in one transaction, then invalidate.
    ///
    /// On error nothing is written and no invalidation is published.
    async fn merge_page(&self, merge: PageMerge) -> Result<(), StorageError>;

    /// Clear items and cursors atomically.
    async fn clear_all(&self) -> Result<(), StorageError>;

    /// Current row counts.
    async fn stats(&self) -> Result<CacheStats, StorageError> {
        Ok(CacheStats {
            items: self.count_items(&NameFilter::All).await?,
            cursors: self.cursor_count().await?,
        })
    }
}
