//! Load status state machine for offline-pager.
//!
//! Every paged stream tracks one [`LoadStatus`] per load direction. The
//! state machine is pure: it takes the current [`LoadStates`] and a
//! [`LoadEvent`] and returns the new states. The stream driver in
//! pager-client feeds it events as loads start and finish.

use offline_pager_types::{FetchError, LoadDirection};
use serde::Serialize;
use thiserror::Error;

/// Why a load failed, in a form that can be cloned into every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LoadFailure {
    /// No connectivity or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a failure status.
    #[error("http error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The server's payload could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The local cache failed; the merge was rolled back.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LoadFailure {
    /// Whether the failure was a transport-level one.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<FetchError> for LoadFailure {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Network(msg) => Self::Network(msg),
            FetchError::Http { status, body } => Self::Http { status, body },
            FetchError::InvalidResponse(msg) => Self::InvalidResponse(msg),
        }
    }
}

/// Status of one boundary of the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Nothing in flight; more data may exist.
    #[default]
    Idle,
    /// A load is in flight.
    Loading,
    /// The last load failed; `retry()` re-issues it.
    Error(LoadFailure),
    /// The network reported no more data in this direction.
    Exhausted,
}

impl LoadStatus {
    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether no more data exists in this direction.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// The failure, if the last load failed.
    pub fn error(&self) -> Option<&LoadFailure> {
        match self {
            Self::Error(failure) => Some(failure),
            _ => None,
        }
    }

    fn settled(end_of_pagination: bool) -> Self {
        if end_of_pagination {
            Self::Exhausted
        } else {
            Self::Idle
        }
    }
}

/// Events fed to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// A load was dispatched.
    Started(LoadDirection),
    /// A load completed successfully.
    Succeeded {
        /// Direction of the load.
        direction: LoadDirection,
        /// Whether the boundary has no more data.
        end_of_pagination: bool,
    },
    /// A load failed.
    Failed {
        /// Direction of the load.
        direction: LoadDirection,
        /// Why it failed.
        failure: LoadFailure,
    },
    /// A load ended without a result (coalesced or superseded).
    Abandoned(LoadDirection),
    /// Forget everything, e.g. when a stream restarts.
    Reset,
}

/// Load status of the three boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStates {
    /// Refresh (initial load or invalidation).
    pub refresh: LoadStatus,
    /// Start of the window.
    pub prepend: LoadStatus,
    /// End of the window.
    pub append: LoadStatus,
}

impl LoadStates {
    /// All boundaries idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status for `direction`.
    pub fn get(&self, direction: LoadDirection) -> &LoadStatus {
        match direction {
            LoadDirection::Refresh => &self.refresh,
            LoadDirection::Prepend => &self.prepend,
            LoadDirection::Append => &self.append,
        }
    }

    fn slot(&mut self, direction: LoadDirection) -> &mut LoadStatus {
        match direction {
            LoadDirection::Refresh => &mut self.refresh,
            LoadDirection::Prepend => &mut self.prepend,
            LoadDirection::Append => &mut self.append,
        }
    }

    /// Process an event and return the new states.
    ///
    /// A successful refresh replaced the cached data, so it also resets both
    /// edges: exhausted if the refreshed page was empty, idle otherwise. An
    /// edge that is still loading keeps its status until its own event.
    pub fn on_event(mut self, event: LoadEvent) -> Self {
        match event {
            LoadEvent::Started(direction) => {
                *self.slot(direction) = LoadStatus::Loading;
            }
            LoadEvent::Succeeded {
                direction: LoadDirection::Refresh,
                end_of_pagination,
            } => {
                self.refresh = LoadStatus::Idle;
                for edge in [&mut self.prepend, &mut self.append] {
                    if !edge.is_loading() {
                        *edge = LoadStatus::settled(end_of_pagination);
                    }
                }
            }
            LoadEvent::Succeeded {
                direction,
                end_of_pagination,
            } => {
                *self.slot(direction) = LoadStatus::settled(end_of_pagination);
            }
            LoadEvent::Failed { direction, failure } => {
                *self.slot(direction) = LoadStatus::Error(failure);
            }
            LoadEvent::Abandoned(direction) => {
                let slot = self.slot(direction);
                if slot.is_loading() {
                    *slot = LoadStatus::Idle;
                }
            }
            LoadEvent::Reset => {
                self = Self::default();
            }
        }
        self
    }

    /// Whether any boundary has a load in flight.
    pub fn is_loading(&self) -> bool {
        self.refresh.is_loading() || self.prepend.is_loading() || self.append.is_loading()
    }

    /// No earlier data exists.
    pub fn is_exhausted_at_start(&self) -> bool {
        self.prepend.is_exhausted()
    }

    /// No later data exists.
    pub fn is_exhausted_at_end(&self) -> bool {
        self.append.is_exhausted()
    }

    /// The first failure, checking refresh, then prepend, then append.
    pub fn first_error(&self) -> Option<(LoadDirection, &LoadFailure)> {
        LoadDirection::ALL
            .into_iter()
            .find_map(|d| self.get(d).error().map(|f| (d, f)))
    }
}
