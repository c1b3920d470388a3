//! Pager - the main interface for offline-pager.
//!
//! A [`Pager`] ties a [`PageFetcher`] and a [`PagingStore`] together and
//! hands out [`PagedStream`]s. Only one stream is current at a time:
//! opening a new one stops the previous stream's driver, and any of its
//! loads still in flight are dropped before they can write.
//!
//! # Example
//!
//! ```ignore
//! use offline_pager_client::{HttpFetcher, Pager, PagerConfig};
//! use offline_pager_store::SqliteStore;
//!
//! let fetcher = HttpFetcher::new("https://api.example.com", Duration::from_secs(10))?;
//! let store = SqliteStore::new(&path).await?;
//! let pager = Pager::new(PagerConfig::default(), fetcher, store)?;
//!
//! let mut stream = pager.open_stream(Query::new("shoe")).await;
//! while let Some(snapshot) = stream.next().await {
//!     render(&snapshot);
//! }
//! ```

use crate::coordinator::{PagingCoordinator, WriteGate};
use crate::error::PagerError;
use crate::fetcher::PageFetcher;
use crate::stream::{spawn_stream, InitialRefresh, PagedStream};
use pager_core::{substring_pattern, WindowPolicy};
use pager_store::PagingStore;
use pager_types::{PageNumber, Query};
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info};

/// Configuration for a [`Pager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerConfig {
    /// Items per page.
    pub page_size: usize,
    /// How close to a window edge an access must be to load more.
    pub prefetch_distance: usize,
    /// Window length for the first read and after a refresh.
    pub initial_load_size: usize,
    /// Network page a refresh starts from.
    pub starting_page: PageNumber,
    /// Whether streams refresh as soon as they open.
    pub initial_refresh: InitialRefresh,
}

impl Default for PagerConfig {
    fn default() -> Self {
        let policy = WindowPolicy::default();
        Self {
            page_size: policy.page_size,
            prefetch_distance: policy.prefetch_distance,
            initial_load_size: policy.initial_load_size,
            starting_page: PageNumber::FIRST,
            initial_refresh: InitialRefresh::Launch,
        }
    }
}

impl PagerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size. Prefetch distance and initial load size are reset
    /// to one and three pages; set them afterwards to override.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        let policy = WindowPolicy::new(page_size);
        self.page_size = page_size;
        self.prefetch_distance = policy.prefetch_distance;
        self.initial_load_size = policy.initial_load_size;
        self
    }

    /// Set the prefetch distance.
    pub fn with_prefetch_distance(mut self, distance: usize) -> Self {
        self.prefetch_distance = distance;
        self
    }

    /// Set the initial load size.
    pub fn with_initial_load_size(mut self, size: usize) -> Self {
        self.initial_load_size = size;
        self
    }

    /// Set the starting network page.
    pub fn with_starting_page(mut self, page: PageNumber) -> Self {
        self.starting_page = page;
        self
    }

    /// Set the initial refresh behavior.
    pub fn with_initial_refresh(mut self, initial_refresh: InitialRefresh) -> Self {
        self.initial_refresh = initial_refresh;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), PagerError> {
        if self.page_size == 0 {
            return Err(PagerError::InvalidConfig("page_size must be at least 1".into()));
        }
        if self.initial_load_size == 0 {
            return Err(PagerError::InvalidConfig(
                "initial_load_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Window policy derived from this configuration.
    pub fn policy(&self) -> WindowPolicy {
        WindowPolicy {
            page_size: self.page_size,
            prefetch_distance: self.prefetch_distance,
            initial_load_size: self.initial_load_size,
        }
    }
}

/// Offline-first pager over a remote item source and a local cache.
pub struct Pager<F, S> {
    config: PagerConfig,
    fetcher: Arc<F>,
    store: S,
    gate: WriteGate,
    current: Mutex<Option<AbortHandle>>,
}

impl<F: PageFetcher, S: PagingStore> Pager<F, S> {
    /// Create a pager.
    pub fn new(config: PagerConfig, fetcher: F, store: S) -> Result<Self, PagerError> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            store,
            gate: WriteGate::new(),
            current: Mutex::new(None),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// The local cache.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The remote page source.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// A coordinator for `query`, bound to the current stream epoch.
    pub fn coordinator(&self, query: Query) -> PagingCoordinator<F, S> {
        PagingCoordinator::new(
            Arc::clone(&self.fetcher),
            self.store.clone(),
            query,
            self.config.starting_page,
        )
        .with_gate(self.gate.clone())
    }

    /// Open a stream for `query`, replacing the current one.
    ///
    /// Waits for a merge in progress, so nothing from the replaced stream
    /// lands after this returns.
    pub async fn open_stream(&self, query: Query) -> PagedStream {
        let (epoch, coordinator) = {
            let _write = self.gate.write().await;
            (self.gate.advance(), self.coordinator(query.clone()))
        };
        let live = match substring_pattern(&query) {
            Some(pattern) => self.store.query_by_name(&pattern),
            None => self.store.query_all(),
        };

        let (stream, driver) = spawn_stream(
            coordinator,
            live,
            self.config.policy(),
            self.config.initial_refresh,
        );

        let previous = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(driver);
        if let Some(previous) = previous {
            debug!(epoch, "stopping previous stream");
            previous.abort();
        }
        stream
    }

    /// Clear every cached item and cursor.
    pub async fn clear_cache(&self) -> Result<(), PagerError> {
        let _write = self.gate.write().await;
        self.store.clear_all().await?;
        info!("cache cleared");
        Ok(())
    }
}
