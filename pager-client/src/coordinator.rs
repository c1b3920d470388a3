//! Paging coordinator - reconciles remote pages with the local cache.
//!
//! For each load the coordinator:
//! 1. resolves the network page from the cursor of the item the load is
//!    anchored on ([`pager_core::resolve_page`])
//! 2. fetches that page
//! 3. writes items and cursors in one transaction, clearing the cache
//!    first on refresh
//!
//! ```text
//! stream driver ── load(direction, window) ──► PagingCoordinator
//!                                               │   get_cursor
//!                                               ├──────────────► store
//!                                               │   fetch
//!                                               ├──────────────► fetcher
//!                                               │   merge_page (write gate held)
//!                                               └──────────────► store
//! ```
//!
//! Only one load per direction runs at a time on a coordinator; a second
//! one returns [`LoadOutcome::Coalesced`]. All coordinators of a
//! [`Pager`](crate::Pager) share a [`WriteGate`], so merges are serialized
//! and a coordinator whose stream was replaced stops writing.

use crate::error::LoadError;
use crate::fetcher::PageFetcher;
use pager_core::{cursors_for_page, resolve_page, Resolution, WindowState};
use pager_store::{PageMerge, PagingStore, StorageError};
use pager_types::{LoadDirection, PageNumber, Query};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, info, warn};

/// Result of one coordinator load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The load finished; `end_of_pagination` reports that the boundary has
    /// no more data.
    Success {
        /// Whether the boundary has no more data.
        end_of_pagination: bool,
    },
    /// The load failed. Nothing was written.
    Error(LoadError),
    /// A load for the same direction was already in flight.
    Coalesced,
    /// The stream this coordinator serves was replaced before the merge.
    /// Nothing was written.
    Superseded,
}

impl LoadOutcome {
    /// Whether the load completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Write lock and stream epoch shared by every coordinator of one pager.
#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Arc<AsyncMutex<()>>,
    epoch: Arc<AtomicU64>,
}

impl WriteGate {
    /// A fresh gate at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stream epoch.
    pub fn current(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Start a new epoch, superseding every coordinator bound to an older one.
    pub fn advance(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Hold the write lock.
    pub async fn write(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

/// Drives network loads for one query.
pub struct PagingCoordinator<F, S> {
    fetcher: Arc<F>,
    store: S,
    query: Query,
    starting_page: PageNumber,
    gate: WriteGate,
    epoch: u64,
    in_flight: Arc<Mutex<HashSet<LoadDirection>>>,
}

impl<F, S: Clone> Clone for PagingCoordinator<F, S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            store: self.store.clone(),
            query: self.query.clone(),
            starting_page: self.starting_page,
            gate: self.gate.clone(),
            epoch: self.epoch,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<F: PageFetcher, S: PagingStore> PagingCoordinator<F, S> {
    /// Create a coordinator with its own write gate.
    pub fn new(fetcher: Arc<F>, store: S, query: Query, starting_page: PageNumber) -> Self {
        let gate = WriteGate::new();
        Self {
            fetcher,
            store,
            query,
            starting_page,
            epoch: gate.current(),
            gate,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Bind to a shared gate at its current epoch.
    pub fn with_gate(mut self, gate: WriteGate) -> Self {
        self.epoch = gate.current();
        self.gate = gate;
        self
    }

    /// Query this coordinator loads for.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Whether no newer stream has replaced this one.
    pub fn is_current(&self) -> bool {
        self.gate.current() == self.epoch
    }

    /// Run one load.
    pub async fn load(&self, direction: LoadDirection, window: &WindowState) -> LoadOutcome {
        let Some(_flight) = self.begin_flight(direction) else {
            debug!(%direction, query = %self.query, "load already in flight");
            return LoadOutcome::Coalesced;
        };

        let target = match self.resolve(direction, window).await {
            Ok(Resolution::Fetch(page)) => page,
            Ok(Resolution::Done { end_of_pagination }) => {
                return LoadOutcome::Success { end_of_pagination };
            }
            Err(e) => {
                warn!(%direction, error = %e, "cursor lookup failed");
                return LoadOutcome::Error(LoadError::Storage(e));
            }
        };

        let fetched = match self.fetcher.fetch(target, &self.query).await {
            Ok(page) => page,
            Err(e) => {
                warn!(%direction, page = %target, error = %e, "fetch failed");
                return LoadOutcome::Error(LoadError::Fetch(e));
            }
        };

        let _write = self.gate.write().await;
        if !self.is_current() {
            debug!(%direction, page = %target, "stream replaced, dropping page");
            return LoadOutcome::Superseded;
        }

        let end_of_pagination = fetched.is_end();
        let merge = PageMerge {
            clear_first: direction == LoadDirection::Refresh,
            cursors: cursors_for_page(&fetched.items, target, self.starting_page),
            items: fetched.items,
        };
        let count = merge.items.len();
        if let Err(e) = self.store.merge_page(merge).await {
            warn!(%direction, page = %target, error = %e, "merge failed");
            return LoadOutcome::Error(LoadError::Storage(e));
        }

        info!(
            %direction,
            page = %target,
            items = count,
            end_of_pagination,
            query = %self.query,
            "merged page"
        );
        LoadOutcome::Success { end_of_pagination }
    }

    async fn resolve(
        &self,
        direction: LoadDirection,
        window: &WindowState,
    ) -> Result<Resolution, StorageError> {
        let cursor = match window.anchor_item(direction) {
            Some(item) => self.store.get_cursor(item.id).await?,
            None => None,
        };
        let resolution = resolve_page(direction, cursor.as_ref(), self.starting_page);
        debug!(%direction, ?cursor, ?resolution, "resolved page");
        Ok(resolution)
    }

    fn flights(&self) -> std::sync::MutexGuard<'_, HashSet<LoadDirection>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_flight(&self, direction: LoadDirection) -> Option<FlightGuard> {
        if !self.flights().insert(direction) {
            return None;
        }
        Some(FlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            direction,
        })
    }
}

/// Marks a direction in flight until dropped.
struct FlightGuard {
    in_flight: Arc<Mutex<HashSet<LoadDirection>>>,
    direction: LoadDirection,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.direction);
    }
}
