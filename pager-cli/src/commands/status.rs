//! Show what is cached.

use anyhow::{Context, Result};
use pager_store::{PagingStore, SqliteStore};
use std::path::Path;

/// Run the status command.
pub async fn run(store: &SqliteStore, database: &Path) -> Result<()> {
    let stats = store.stats().await.context("Failed to read cache")?;

    println!("=== pager-cli status ===");
    println!();
    println!("Cache:");
    println!("  Database: {}", database.display());
    println!("  Items:    {}", stats.items);
    println!("  Cursors:  {}", stats.cursors);

    if stats.items == 0 {
        println!();
        println!("Cache is empty. Run 'pager-cli browse' to fetch the first page.");
    } else if stats.items != stats.cursors {
        // Cursors are written with their items, so a gap means a damaged file.
        println!();
        println!("Warning: item and cursor counts differ; run 'pager-cli clear'.");
    }

    Ok(())
}
