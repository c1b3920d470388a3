//! Page resolution for offline-pager.
//!
//! This module decides which network page a load should request, given the
//! load direction and the [`PageCursor`] of the item the load is anchored
//! on, and derives the cursors recorded for a fetched page.
//!
//! The REST API numbers pages sequentially, so every cached item remembers
//! the page before and after the one it arrived on. Any visible item is
//! then enough to continue paging in either direction.

use offline_pager_types::{Item, LoadDirection, PageCursor, PageNumber};

/// What a load should do once its anchor cursor is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Request this page from the network.
    Fetch(PageNumber),
    /// Nothing to fetch; report success with this end-of-pagination flag.
    Done {
        /// Whether the boundary has no more data.
        end_of_pagination: bool,
    },
}

/// Resolve the network page for a load.
///
/// - `Refresh`: `cursor` belongs to the item closest to the anchor
///   position. The page that contained it is `next - 1`; without a cursor,
///   or once that item's page had no successor, the starting page is used.
/// - `Prepend`: `cursor` belongs to the first loaded item. A missing cursor
///   means the refresh result has not been persisted yet, so the load
///   succeeds without fetching and can be retried later. A cursor without
///   `prev` means the start of the data was reached.
/// - `Append`: symmetric to `Prepend`, using the last loaded item and `next`.
pub fn resolve_page(
    direction: LoadDirection,
    cursor: Option<&PageCursor>,
    starting_page: PageNumber,
) -> Resolution {
    match direction {
        LoadDirection::Refresh => {
            let page = cursor
                .and_then(|c| c.next)
                .and_then(|next| next.prev())
                .unwrap_or(starting_page);
            Resolution::Fetch(page)
        }
        LoadDirection::Prepend => match cursor {
            None => Resolution::Done {
                end_of_pagination: false,
            },
            Some(PageCursor { prev: None, .. }) => Resolution::Done {
                end_of_pagination: true,
            },
            Some(PageCursor {
                prev: Some(page), ..
            }) => Resolution::Fetch(*page),
        },
        LoadDirection::Append => match cursor {
            None => Resolution::Done {
                end_of_pagination: false,
            },
            Some(PageCursor { next: None, .. }) => Resolution::Done {
                end_of_pagination: true,
            },
            Some(PageCursor {
                next: Some(page), ..
            }) => Resolution::Fetch(*page),
        },
    }
}

/// Previous/next keys shared by every item of a fetched page.
///
/// There is no page before the starting page, and an empty page has no
/// successor.
pub fn page_keys(
    target: PageNumber,
    starting_page: PageNumber,
    fetched_empty: bool,
) -> (Option<PageNumber>, Option<PageNumber>) {
    let prev = if target == starting_page {
        None
    } else {
        target.prev()
    };
    let next = if fetched_empty {
        None
    } else {
        Some(target.next())
    };
    (prev, next)
}

/// Build one cursor per fetched item, all sharing the page's keys.
pub fn cursors_for_page(
    items: &[Item],
    target: PageNumber,
    starting_page: PageNumber,
) -> Vec<PageCursor> {
    let (prev, next) = page_keys(target, starting_page, items.is_empty());
    items
        .iter()
        .map(|item| PageCursor::new(item.id, prev, next))
        .collect()
}
