//! Paged stream - the consumer side of a pager.
//!
//! A [`PagedStream`] is backed by a driver task that owns:
//! - a live view of the cache filtered by the stream's query
//! - the window (offset and length) currently materialized from it
//! - the per-boundary [`LoadStates`]
//! - the [`PagingCoordinator`] that fetches pages from the network
//!
//! The consumer reports what it looks at with [`PagedStream::access`]; the
//! driver grows the window from the cache or asks the coordinator for more
//! pages, and publishes a fresh [`WindowSnapshot`] whenever anything
//! changes. Snapshots are conflated: a slow consumer only sees the latest.

use crate::coordinator::{LoadOutcome, PagingCoordinator};
use crate::fetcher::PageFetcher;
use pager_core::{
    LoadEvent, LoadFailure, LoadStates, WindowBounds, WindowPolicy, WindowState,
};
use pager_store::{LiveQuery, PagingStore, StorageError};
use pager_types::{Item, LoadDirection, Query};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Whether a new stream refreshes from the network when it starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialRefresh {
    /// Issue a refresh as soon as the stream starts.
    #[default]
    Launch,
    /// Show cached data only until the consumer asks for a refresh.
    Skip,
}

/// What the consumer sees at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSnapshot {
    /// Query the stream was opened for.
    pub query: Query,
    /// Absolute index of `items[0]` in the filtered cache.
    pub offset: usize,
    /// Number of cached items matching the query.
    pub total: usize,
    /// Materialized items.
    pub items: Vec<Item>,
    /// Status of refresh, prepend and append.
    pub load_states: LoadStates,
}

impl WindowSnapshot {
    /// Nothing to show and nothing loading: the "no results" state.
    pub fn is_empty_result(&self) -> bool {
        !self.load_states.refresh.is_loading() && self.total == 0
    }

    /// Absolute index one past the last materialized item.
    pub fn end(&self) -> usize {
        self.offset + self.items.len()
    }

    /// Item at an absolute index, if materialized.
    pub fn get(&self, index: usize) -> Option<&Item> {
        index
            .checked_sub(self.offset)
            .and_then(|i| self.items.get(i))
    }

    /// Absolute index of the last materialized item.
    pub fn last_index(&self) -> Option<usize> {
        self.end().checked_sub(1).filter(|_| !self.items.is_empty())
    }
}

#[derive(Debug)]
enum Command {
    Access(usize),
    Retry,
    Refresh,
}

/// A live, paged view of the cache for one query.
///
/// Dropping the stream (or calling [`cancel`](Self::cancel)) stops the
/// driver and aborts its in-flight loads.
#[derive(Debug)]
pub struct PagedStream {
    query: Query,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Option<WindowSnapshot>>,
    driver: AbortHandle,
    cancelled: bool,
}

impl PagedStream {
    /// Query this stream was opened for.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Wait for the next snapshot. Returns `None` once the stream is
    /// cancelled or replaced.
    pub async fn next(&mut self) -> Option<WindowSnapshot> {
        if self.cancelled {
            return None;
        }
        self.snapshots.changed().await.ok()?;
        self.snapshots.borrow_and_update().clone()
    }

    /// Latest published snapshot, without waiting.
    pub fn latest(&self) -> Option<WindowSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Report that the consumer is looking at the item at `index`.
    pub fn access(&self, index: usize) {
        self.send(Command::Access(index));
    }

    /// Re-issue failed loads. A failed refresh goes first and the
    /// boundaries wait for it.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Refresh from the network, anchored at the last accessed item.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Stop the driver and every in-flight load.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            debug!(query = %self.query, "stream cancelled");
        }
        self.cancelled = true;
        self.driver.abort();
    }

    /// Whether the driver has stopped.
    pub fn is_closed(&self) -> bool {
        self.cancelled || self.driver.is_finished()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(query = %self.query, "stream driver gone, command dropped");
        }
    }
}

impl Drop for PagedStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Start a driver task. Returns the stream and a second handle to its
/// driver so the pager can stop it when the stream is replaced.
pub(crate) fn spawn_stream<F: PageFetcher, S: PagingStore>(
    coordinator: PagingCoordinator<F, S>,
    live: LiveQuery<S>,
    policy: WindowPolicy,
    initial_refresh: InitialRefresh,
) -> (PagedStream, AbortHandle) {
    let query = coordinator.query().clone();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (snapshots_tx, snapshots_rx) = watch::channel(None);

    let driver = StreamDriver {
        query: query.clone(),
        coordinator,
        live,
        policy,
        offset: 0,
        window_len: policy.initial_load_size,
        total: 0,
        items: Vec::new(),
        anchor: None,
        states: LoadStates::new(),
        generation: 0,
        boundary_loads: HashMap::new(),
        failed: HashMap::new(),
        loads: JoinSet::new(),
        commands: commands_rx,
        snapshots: snapshots_tx,
    };
    let handle = tokio::spawn(driver.run(initial_refresh));
    info!(query = %query, "stream opened");

    let stream = PagedStream {
        query,
        commands: commands_tx,
        snapshots: snapshots_rx,
        driver: handle.abort_handle(),
        cancelled: false,
    };
    (stream, handle.abort_handle())
}

struct FinishedLoad {
    direction: LoadDirection,
    generation: u64,
    window: WindowState,
    outcome: LoadOutcome,
}

struct StreamDriver<F, S: PagingStore> {
    query: Query,
    coordinator: PagingCoordinator<F, S>,
    live: LiveQuery<S>,
    policy: WindowPolicy,
    offset: usize,
    window_len: usize,
    total: usize,
    items: Vec<Item>,
    /// Absolute index of the last accessed item.
    anchor: Option<usize>,
    states: LoadStates,
    /// Bumped by every refresh. Boundary results from an older generation
    /// are dropped.
    generation: u64,
    /// Prepend and append loads in flight.
    boundary_loads: HashMap<LoadDirection, AbortHandle>,
    /// Window each failed direction failed with.
    failed: HashMap<LoadDirection, WindowState>,
    loads: JoinSet<FinishedLoad>,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Option<WindowSnapshot>>,
}

impl<F: PageFetcher, S: PagingStore> StreamDriver<F, S> {
    async fn run(mut self, initial_refresh: InitialRefresh) {
        if let Err(e) = self.reload().await {
            self.on_storage_error(e);
        }
        match initial_refresh {
            InitialRefresh::Launch => self.dispatch(LoadDirection::Refresh),
            InitialRefresh::Skip => self.publish(),
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
                Some(joined) = self.loads.join_next(), if !self.loads.is_empty() => {
                    self.on_load_done(joined).await;
                }
                changed = self.live.changed() => match changed {
                    Ok(_) => self.reload_and_publish().await,
                    Err(_) => break,
                },
            }
        }
        debug!(query = %self.query, "stream driver stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Access(index) => self.on_access(index).await,
            Command::Retry => self.retry(),
            Command::Refresh => self.dispatch(LoadDirection::Refresh),
        }
    }

    async fn on_access(&mut self, index: usize) {
        self.anchor = Some(index);
        let page_size = self.policy.page_size;
        let plan = self.policy.plan(
            index,
            WindowBounds {
                offset: self.offset,
                loaded: self.items.len(),
                total: self.total,
            },
        );

        let mut grown = false;
        if plan.extend_start {
            let new_offset = self.offset.saturating_sub(page_size);
            self.window_len += self.offset - new_offset;
            self.offset = new_offset;
            grown = true;
        }
        if plan.extend_end {
            self.window_len += page_size;
            grown = true;
        }
        if plan.remote_prepend {
            self.dispatch(LoadDirection::Prepend);
        }
        if plan.remote_append {
            self.dispatch(LoadDirection::Append);
        }
        if grown {
            debug!(offset = self.offset, len = self.window_len, "window grown from cache");
            self.reload_and_publish().await;
        }
    }

    fn retry(&mut self) {
        if self.failed.is_empty() {
            debug!(query = %self.query, "nothing to retry");
            return;
        }
        let directions = if self.failed.contains_key(&LoadDirection::Refresh) {
            vec![LoadDirection::Refresh]
        } else {
            vec![LoadDirection::Prepend, LoadDirection::Append]
        };
        for direction in directions {
            if self.states.get(direction).is_loading()
                || (direction != LoadDirection::Refresh && self.states.refresh.is_loading())
            {
                continue;
            }
            if let Some(window) = self.failed.remove(&direction) {
                debug!(%direction, "retrying failed load");
                self.spawn_load(direction, window);
            }
        }
    }

    /// Start a load unless that boundary is busy, failed or exhausted.
    fn dispatch(&mut self, direction: LoadDirection) {
        let status = self.states.get(direction);
        if status.is_loading() {
            debug!(%direction, "load already running");
            return;
        }
        if direction != LoadDirection::Refresh
            && (status.is_exhausted()
                || status.error().is_some()
                || self.states.refresh.is_loading())
        {
            return;
        }
        let window = self.window_state();
        self.spawn_load(direction, window);
    }

    fn spawn_load(&mut self, direction: LoadDirection, window: WindowState) {
        if direction == LoadDirection::Refresh {
            self.abort_boundary_loads();
        }
        self.states = std::mem::take(&mut self.states).on_event(LoadEvent::Started(direction));
        let coordinator = self.coordinator.clone();
        let generation = self.generation;
        let handle = self.loads.spawn(async move {
            let outcome = coordinator.load(direction, &window).await;
            FinishedLoad {
                direction,
                generation,
                window,
                outcome,
            }
        });
        if direction != LoadDirection::Refresh {
            self.boundary_loads.insert(direction, handle);
        }
        self.publish();
    }

    /// Stop prepend and append loads so none merges after a refresh has
    /// cleared the cache.
    fn abort_boundary_loads(&mut self) {
        self.generation += 1;
        for (direction, handle) in self.boundary_loads.drain() {
            debug!(%direction, "aborting load, refresh started");
            handle.abort();
            self.states =
                std::mem::take(&mut self.states).on_event(LoadEvent::Abandoned(direction));
        }
    }

    async fn on_load_done(&mut self, joined: Result<FinishedLoad, JoinError>) {
        let FinishedLoad {
            direction,
            generation,
            window,
            outcome,
        } = match joined {
            Ok(finished) => finished,
            Err(e) if e.is_cancelled() => {
                debug!("load aborted");
                return;
            }
            Err(e) => {
                warn!(error = %e, "load task ended abnormally");
                return;
            }
        };

        if direction != LoadDirection::Refresh {
            if generation != self.generation {
                // Finished before its abort took effect; the refresh clears it.
                debug!(%direction, "dropping result from before the last refresh");
                self.reload_and_publish().await;
                return;
            }
            self.boundary_loads.remove(&direction);
        }

        let event = match outcome {
            LoadOutcome::Success { end_of_pagination } => {
                if direction == LoadDirection::Refresh {
                    self.offset = 0;
                    self.window_len = self.policy.initial_load_size;
                    self.anchor = None;
                    self.failed.clear();
                } else {
                    if !end_of_pagination {
                        self.window_len += self.policy.page_size;
                    }
                    self.failed.remove(&direction);
                }
                LoadEvent::Succeeded {
                    direction,
                    end_of_pagination,
                }
            }
            LoadOutcome::Error(e) => {
                warn!(%direction, error = %e, query = %self.query, "load failed");
                self.failed.insert(direction, window);
                LoadEvent::Failed {
                    direction,
                    failure: e.into(),
                }
            }
            LoadOutcome::Coalesced | LoadOutcome::Superseded => LoadEvent::Abandoned(direction),
        };
        self.states = std::mem::take(&mut self.states).on_event(event);
        self.reload_and_publish().await;
    }

    fn window_state(&self) -> WindowState {
        let anchor = self.anchor.map(|a| a.saturating_sub(self.offset));
        WindowState::from_items(
            self.query.clone(),
            &self.items,
            self.policy.page_size,
            anchor,
        )
    }

    async fn reload(&mut self) -> Result<(), StorageError> {
        let total = self.live.count().await?;
        if self.offset >= total {
            self.offset = total.saturating_sub(self.window_len);
        }
        let items = self.live.load(self.offset, self.window_len).await?;
        debug!(
            offset = self.offset,
            loaded = items.len(),
            total,
            "window reloaded"
        );
        self.total = total;
        self.items = items;
        Ok(())
    }

    async fn reload_and_publish(&mut self) {
        if let Err(e) = self.reload().await {
            self.on_storage_error(e);
        }
        self.publish();
    }

    fn on_storage_error(&mut self, error: StorageError) {
        warn!(error = %error, query = %self.query, "window reload failed");
        self.states = std::mem::take(&mut self.states).on_event(LoadEvent::Failed {
            direction: LoadDirection::Refresh,
            failure: LoadFailure::Storage(error.to_string()),
        });
    }

    fn publish(&self) {
        let snapshot = WindowSnapshot {
            query: self.query.clone(),
            offset: self.offset,
            total: self.total,
            items: self.items.clone(),
            load_states: self.states.clone(),
        };
        self.snapshots.send_if_modified(|current| {
            if current.as_ref() == Some(&snapshot) {
                false
            } else {
                *current = Some(snapshot);
                true
            }
        });
    }
}
