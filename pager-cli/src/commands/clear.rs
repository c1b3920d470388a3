//! Drop every cached item and cursor.

use anyhow::{Context, Result};
use pager_store::{PagingStore, SqliteStore};
use tracing::info;

/// Run the clear command.
pub async fn run(store: &SqliteStore) -> Result<()> {
    let before = store.stats().await.context("Failed to read cache")?;
    store.clear_all().await.context("Failed to clear cache")?;
    info!(items = before.items, cursors = before.cursors, "cache cleared");

    println!("Cleared {} cached items.", before.items);
    Ok(())
}
