//! # pager-core
//!
//! Pure paging logic for offline-pager (no I/O, instant tests).
//!
//! This crate implements the decisions behind offline paging without any
//! network or disk access:
//! - [`resolve`]: which network page a load should fetch, and the page
//!   cursors to record for a fetched page
//! - [`window`]: the loaded window handed to the coordinator
//! - [`policy`]: when a window access grows the window from the cache and
//!   when it has to go to the network
//! - [`state`]: per-boundary load status as a state machine
//! - [`pattern`]: encoding search text into a cache filter pattern
//!
//! The actual I/O is performed by `pager-client` and `pager-store`, which
//! act on the values produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pattern;
pub mod policy;
pub mod resolve;
pub mod state;
pub mod window;

pub use pattern::{substring_pattern, LIKE_ESCAPE};
pub use policy::{AccessPlan, WindowBounds, WindowPolicy};
pub use resolve::{cursors_for_page, page_keys, resolve_page, Resolution};
pub use state::{LoadEvent, LoadFailure, LoadStates, LoadStatus};
pub use window::{LoadedPage, WindowState};
