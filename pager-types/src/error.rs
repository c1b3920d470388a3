//! Error types for offline-pager.

use thiserror::Error;

/// Errors returned by a remote page fetch.
///
/// Transport failures are kept apart from server failures so callers can
/// tell "offline" from "the server said no".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No connectivity, or the request failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("http error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The server answered, but the payload could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Whether this is a transport-level failure.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
