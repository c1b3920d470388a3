//! Wire format of the items REST API.
//!
//! `GET /items/?page={n}` and `GET /items/?search={q}&page={n}` both answer
//! with a paginated envelope. Only `results` drives paging; `count`,
//! `next` and `previous` are accepted and ignored because page cursors are
//! tracked locally.

use serde::{Deserialize, Serialize};

use crate::{FetchError, Item};

/// Paginated response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPageResponse {
    /// Total number of matching items on the server.
    #[serde(default)]
    pub count: u64,
    /// Link to the next page.
    #[serde(default)]
    pub next: Option<String>,
    /// Link to the previous page.
    #[serde(default)]
    pub previous: Option<String>,
    /// Items on this page.
    #[serde(default)]
    pub results: Vec<Item>,
}

impl ItemPageResponse {
    /// Decode from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, FetchError> {
        serde_json::from_slice(bytes).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }

    /// Encode to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, FetchError> {
        serde_json::to_vec(self).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

/// One fetched page.
///
/// An empty page is the end-of-data signal for the direction it was
/// requested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Items in server order.
    pub items: Vec<Item>,
}

impl PageResult {
    /// Wrap fetched items.
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Whether the page signals the end of the data.
    pub fn is_end(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<ItemPageResponse> for PageResult {
    fn from(response: ItemPageResponse) -> Self {
        Self::new(response.results)
    }
}
