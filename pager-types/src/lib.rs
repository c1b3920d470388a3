//! # pager-types
//!
//! Data model and wire format types for offline-pager.
//!
//! This crate provides the foundational types used across all offline-pager crates:
//! - [`ItemId`], [`PageNumber`] - Identity and page ordering types
//! - [`Item`], [`PageCursor`], [`LoadDirection`] - Cached records and load directions
//! - [`Query`] - Normalized search text (empty means "all items")
//! - [`ItemPageResponse`], [`PageResult`] - REST payload and the fetched page
//! - [`FetchError`] - Remote fetch error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod item;
mod query;
mod wire;

pub use error::FetchError;
pub use ids::{ItemId, PageNumber};
pub use item::{Item, LoadDirection, PageCursor};
pub use query::Query;
pub use wire::{ItemPageResponse, PageResult};
