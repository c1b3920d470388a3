//! Live views over the item cache.
//!
//! A [`LiveQuery`] is a filter over the cache plus a subscription to the
//! store's version counter. Reads always go to the database; `changed()`
//! resolves once a write has committed since the last observed version.

use crate::error::StorageError;
use crate::storage::ItemCache;
use pager_types::Item;
use tokio::sync::watch;

/// Which items a live view selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFilter {
    /// Every cached item.
    All,
    /// Items whose name matches a SQL `LIKE` pattern escaped with `\`.
    Pattern(String),
}

impl NameFilter {
    /// Filter for an optional pattern.
    pub fn from_pattern(pattern: Option<String>) -> Self {
        pattern.map(Self::Pattern).unwrap_or(Self::All)
    }
}

/// A filtered view of the cache, sorted by name, that can wait for changes.
#[derive(Debug)]
pub struct LiveQuery<C> {
    cache: C,
    filter: NameFilter,
    changes: watch::Receiver<u64>,
}

impl<C: ItemCache> LiveQuery<C> {
    /// Open a view over `cache`.
    pub fn new(cache: C, filter: NameFilter) -> Self {
        let changes = cache.subscribe();
        Self {
            cache,
            filter,
            changes,
        }
    }

    /// The filter this view applies.
    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    /// Number of matching items.
    pub async fn count(&self) -> Result<usize, StorageError> {
        self.cache.count_items(&self.filter).await
    }

    /// Up to `limit` matching items starting at `offset`.
    pub async fn load(&self, offset: usize, limit: usize) -> Result<Vec<Item>, StorageError> {
        self.cache.load_items(&self.filter, offset, limit).await
    }

    /// Last version this view has observed.
    pub fn version(&self) -> u64 {
        *self.changes.borrow()
    }

    /// Wait for the next committed write and return the new version.
    ///
    /// Several writes committed before this is polled are reported once.
    pub async fn changed(&mut self) -> Result<u64, StorageError> {
        self.changes
            .changed()
            .await
            .map_err(|_| StorageError::Closed)?;
        Ok(*self.changes.borrow_and_update())
    }
}

impl<C: Clone> Clone for LiveQuery<C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            filter: self.filter.clone(),
            changes: self.changes.clone(),
        }
    }
}
