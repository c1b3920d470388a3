//! Identity and page ordering types for offline-pager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of an item, as assigned by the remote API.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Create an ItemId from its raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value of this ItemId.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

/// A network page index.
///
/// Pages are numbered sequentially by the REST API, so the page before
/// `n` is `n - 1` and the page after it is `n + 1`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageNumber(u32);

impl PageNumber {
    /// The page requested when nothing has been loaded yet.
    pub const FIRST: PageNumber = PageNumber(1);

    /// Create a PageNumber with the given value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the numeric value of this PageNumber.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The following page.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding page, or `None` below zero.
    pub fn prev(&self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageNumber({})", self.0)
    }
}
