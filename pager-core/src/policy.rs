//! Windowing policy.
//!
//! Decides, for an access at some index of the filtered cache view, whether
//! the window can grow from rows already in the cache or whether the
//! network has to be asked for another page.

use serde::{Deserialize, Serialize};

/// Window sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    /// Items per page, both for cache reads and for the window's page split.
    pub page_size: usize,
    /// How close to a window edge an access has to be to load more.
    pub prefetch_distance: usize,
    /// Window length used for the first read and after a refresh.
    pub initial_load_size: usize,
}

impl WindowPolicy {
    /// Policy with the conventional defaults for `page_size`: prefetch one
    /// page ahead and start with three pages.
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            prefetch_distance: page_size,
            initial_load_size: page_size.saturating_mul(3),
        }
    }

    /// Plan the reaction to an access at absolute `index`.
    pub fn plan(&self, index: usize, bounds: WindowBounds) -> AccessPlan {
        let near_start = index < bounds.offset.saturating_add(self.prefetch_distance);
        let near_end = index.saturating_add(self.prefetch_distance) >= bounds.end();

        let mut plan = AccessPlan::default();
        if near_start {
            if bounds.offset > 0 {
                plan.extend_start = true;
            } else {
                plan.remote_prepend = true;
            }
        }
        if near_end {
            if bounds.end() < bounds.total {
                plan.extend_end = true;
            } else {
                plan.remote_append = true;
            }
        }
        plan
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Where the window sits inside the filtered cache view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowBounds {
    /// Index of the first loaded item.
    pub offset: usize,
    /// Number of loaded items.
    pub loaded: usize,
    /// Rows in the filtered cache view.
    pub total: usize,
}

impl WindowBounds {
    /// One past the last loaded item.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.loaded)
    }
}

/// Reaction to a window access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPlan {
    /// Read the cached page before the window.
    pub extend_start: bool,
    /// Read the cached page after the window.
    pub extend_end: bool,
    /// The window already starts at the first cached row: ask the network.
    pub remote_prepend: bool,
    /// The window already ends at the last cached row: ask the network.
    pub remote_append: bool,
}

impl AccessPlan {
    /// Whether the access requires no action.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}
