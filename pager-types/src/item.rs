//! Cached records and load directions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ItemId, PageNumber};

/// An item as served by the REST API and stored in the local cache.
///
/// Items are only ever written whole: every insert replaces the row with
/// the same [`ItemId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Primary key.
    pub id: ItemId,
    /// Display name; the cache is ordered by this field.
    pub name: String,
}

impl Item {
    /// Create a new item.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
        }
    }
}

/// Page bookkeeping for one cached item.
///
/// Records which network pages surround the page the item arrived on, so
/// any item in the visible window can be used to work out what to fetch
/// before or after it. All cursors written from the same page response
/// carry identical `prev` and `next` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor {
    /// The item this cursor belongs to.
    pub item_id: ItemId,
    /// Page before the item's page, `None` at the start of the data.
    pub prev: Option<PageNumber>,
    /// Page after the item's page, `None` once the end was reached.
    pub next: Option<PageNumber>,
}

impl PageCursor {
    /// Create a cursor record.
    pub fn new(item_id: ItemId, prev: Option<PageNumber>, next: Option<PageNumber>) -> Self {
        Self {
            item_id,
            prev,
            next,
        }
    }
}

/// Direction of a load relative to the currently loaded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadDirection {
    /// Initial load, or an explicit invalidation.
    Refresh,
    /// The consumer scrolled toward the start of the window.
    Prepend,
    /// The consumer scrolled toward the end of the window.
    Append,
}

impl LoadDirection {
    /// All directions, in a fixed order.
    pub const ALL: [LoadDirection; 3] = [Self::Refresh, Self::Prepend, Self::Append];

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Prepend => "prepend",
            Self::Append => "append",
        }
    }
}

impl fmt::Display for LoadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_deserializes_from_api_shape() {
        let item: Item = serde_json::from_str(r#"{"id": 12, "name": "boot"}"#).unwrap();
        assert_eq!(item, Item::new(12, "boot"));
    }

    #[test]
    fn load_direction_display() {
        assert_eq!(LoadDirection::Refresh.to_string(), "refresh");
        assert_eq!(LoadDirection::Prepend.to_string(), "prepend");
        assert_eq!(LoadDirection::Append.to_string(), "append");
    }

    #[test]
    fn page_cursor_fields() {
        let cursor = PageCursor::new(ItemId::new(1), None, Some(PageNumber::new(2)));
        assert_eq!(cursor.prev, None);
        assert_eq!(cursor.next, Some(PageNumber::new(2)));
    }
}
