//! # pager-client
//!
//! Offline-first paging over a remote items API.
//!
//! This is the main library that applications use to page through items.
//!
//! ## Features
//!
//! - **Offline first**: streams show whatever is cached immediately and
//!   refresh from the network in the background
//! - **Resumable paging**: every cached item remembers the page before and
//!   after it, so paging continues from any visible item
//! - **Fetcher abstraction**: pluggable page source (HTTP, mock)
//! - **Pure decisions**: page resolution and window policy come from
//!   pager-core and are tested without I/O
//!
//! ## Example
//!
//! ```ignore
//! use offline_pager_client::{MockFetcher, Pager, PagerConfig};
//! use offline_pager_store::SqliteStore;
//!
//! let pager = Pager::new(PagerConfig::default(), MockFetcher::new(items, 20), store)?;
//! let mut stream = pager.open_stream(Query::all()).await;
//! while let Some(snapshot) = stream.next().await {
//!     if let Some(last) = snapshot.last_index() {
//!         stream.access(last);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod pager;
pub mod stream;

pub use coordinator::{LoadOutcome, PagingCoordinator, WriteGate};
pub use error::{LoadError, PagerError};
pub use fetcher::{FetchRequest, HttpFetcher, MockFetcher, PageFetcher};
pub use pager::{Pager, PagerConfig};
pub use stream::{InitialRefresh, PagedStream, WindowSnapshot};
