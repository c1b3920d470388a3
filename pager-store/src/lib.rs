//! # pager-store
//!
//! Local durable cache for offline-pager.
//!
//! This crate keeps the items fetched from the remote API together with
//! the page cursor recorded for each of them:
//! - [`CursorStore`]: per-item previous/next page bookkeeping
//! - [`ItemCache`]: items ordered by name, with live filtered views
//! - [`PagingStore`]: both of the above, plus the transactional merge used
//!   when a fetched page lands
//!
//! ## Architecture
//!
//! ```text
//!   coordinator ── merge_page ──►┌──────────────────────────┐
//!                                │   SQLite                 │
//!                                │   items ◄── remote_keys  │
//!                                └────────────┬─────────────┘
//!                                             │ version bump
//!   stream driver ◄── LiveQuery::changed ─────┘
//! ```
//!
//! Every committed write bumps a version counter; live views wake on it and
//! re-read their window.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod live;
pub mod storage;

pub use error::{StorageError, StorageResult};
pub use live::{LiveQuery, NameFilter};
pub use storage::{CacheStats, CursorStore, ItemCache, PageMerge, PagingStore, SqliteStore};
