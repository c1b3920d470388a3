//! The loaded window handed to the paging coordinator.
//!
//! A window is the slice of the cached, filtered item sequence the
//! consumer currently has materialized, split into the pages it was loaded
//! in, plus the anchor position the consumer last scrolled to.

use offline_pager_types::{Item, LoadDirection, Query};
use serde::Serialize;

/// One batch of items loaded into the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadedPage {
    /// Items in cache order.
    pub items: Vec<Item>,
}

impl LoadedPage {
    /// Wrap a batch of items.
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Whether this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Snapshot of the loaded window at the time a load is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowState {
    /// Query the pages were loaded for.
    pub query: Query,
    /// Loaded pages, first to last.
    pub pages: Vec<LoadedPage>,
    /// Index of the item nearest the consumer's scroll position, counted
    /// from the first loaded item. `None` until something was accessed.
    pub anchor_position: Option<usize>,
}

impl WindowState {
    /// An empty window for `query`.
    pub fn new(query: Query) -> Self {
        Self {
            query,
            pages: Vec::new(),
            anchor_position: None,
        }
    }

    /// Split contiguous window items into pages of `page_size`.
    pub fn from_items(
        query: Query,
        items: &[Item],
        page_size: usize,
        anchor_position: Option<usize>,
    ) -> Self {
        let pages = items
            .chunks(page_size.max(1))
            .map(|chunk| LoadedPage::new(chunk.to_vec()))
            .collect();
        Self {
            query,
            pages,
            anchor_position,
        }
    }

    /// Set the anchor position.
    pub fn with_anchor(mut self, position: usize) -> Self {
        self.anchor_position = Some(position);
        self
    }

    /// Total number of loaded items.
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    /// First item of the first non-empty page.
    pub fn first_item(&self) -> Option<&Item> {
        self.pages
            .iter()
            .find(|p| !p.is_empty())
            .and_then(|p| p.items.first())
    }

    /// Last item of the last non-empty page.
    pub fn last_item(&self) -> Option<&Item> {
        self.pages
            .iter()
            .rev()
            .find(|p| !p.is_empty())
            .and_then(|p| p.items.last())
    }

    /// The loaded item at `position`, or the nearest loaded one when the
    /// position lies outside the window.
    pub fn closest_item_to_position(&self, position: usize) -> Option<&Item> {
        let count = self.item_count();
        if count == 0 {
            return None;
        }
        let target = position.min(count - 1);
        self.pages.iter().flat_map(|p| p.items.iter()).nth(target)
    }

    /// The item a load in `direction` is anchored on.
    pub fn anchor_item(&self, direction: LoadDirection) -> Option<&Item> {
        match direction {
            LoadDirection::Refresh => self
                .anchor_position
                .and_then(|position| self.closest_item_to_position(position)),
            LoadDirection::Prepend => self.first_item(),
            LoadDirection::Append => self.last_item(),
        }
    }
}
