//! Error types for pager-client.

use pager_core::LoadFailure;
use pager_store::StorageError;
use pager_types::FetchError;
use thiserror::Error;

/// Why a coordinator load failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The remote page could not be fetched; nothing was written.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The cache failed; the merge was rolled back.
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<LoadError> for LoadFailure {
    fn from(error: LoadError) -> Self {
        match error {
            LoadError::Fetch(fetch) => fetch.into(),
            LoadError::Storage(storage) => LoadFailure::Storage(storage.to_string()),
        }
    }
}

/// Errors from building or driving a [`Pager`](crate::Pager).
#[derive(Debug, Error)]
pub enum PagerError {
    /// Configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
