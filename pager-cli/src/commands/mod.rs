//! CLI command implementations.

pub mod browse;
pub mod clear;
pub mod status;

use anyhow::{Context, Result};
use pager_client::{HttpFetcher, MockFetcher, PageFetcher, Pager};
use pager_store::SqliteStore;
use pager_types::Item;
use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;

/// Pager type shared by the browsing commands.
pub type CliPager = Pager<Arc<dyn PageFetcher>, SqliteStore>;

const DEMO_COLOURS: [&str; 6] = ["black", "blue", "green", "grey", "red", "white"];
const DEMO_KINDS: [&str; 8] = [
    "boot", "coat", "glove", "hat", "scarf", "shirt", "shoe", "sock",
];

/// Open (creating if needed) the cache database.
pub async fn open_store(path: &Path) -> Result<SqliteStore> {
    SqliteStore::new(path)
        .await
        .with_context(|| format!("Failed to open cache at {}", path.display()))
}

/// Build a pager over HTTP, or over the demo catalogue with `mock`.
pub fn pager(config: &AppConfig, store: SqliteStore, mock: bool) -> Result<CliPager> {
    let pager_config = config.pager_config();
    let fetcher: Arc<dyn PageFetcher> = if mock {
        Arc::new(MockFetcher::new(demo_catalogue(), pager_config.page_size))
    } else {
        Arc::new(
            HttpFetcher::new(&config.remote.base_url, config.timeout())
                .context("Invalid remote configuration")?,
        )
    };
    Pager::new(pager_config, fetcher, store).context("Invalid paging configuration")
}

/// Every colour/kind pair, ids in catalogue order.
pub fn demo_catalogue() -> Vec<Item> {
    DEMO_KINDS
        .iter()
        .flat_map(|kind| DEMO_COLOURS.iter().map(move |colour| (colour, kind)))
        .enumerate()
        .map(|(i, (colour, kind))| Item::new(i as i64 + 1, format!("{} {}", colour, kind)))
        .collect()
}
