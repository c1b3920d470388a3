//! Search query normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Search text scoping a paged stream.
///
/// Leading and trailing whitespace is dropped; the empty query stands for
/// "all items" and is sent to the API without a `search` parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Build a query from user input.
    pub fn new(text: &str) -> Self {
        Self(text.trim().to_string())
    }

    /// The unfiltered query.
    pub fn all() -> Self {
        Self(String::new())
    }

    /// Whether this query selects every item.
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    /// The normalized search text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Option<&str>> for Query {
    fn from(text: Option<&str>) -> Self {
        text.map(Query::new).unwrap_or_default()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            f.write_str("<all>")
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}
