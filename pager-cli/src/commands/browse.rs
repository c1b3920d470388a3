//! Browse or search, scrolling one page at a time.
//!
//! Scrolling is simulated the way a list view would do it: once a snapshot
//! settles, the last materialized item is reported as accessed, which makes
//! the pager grow the window from the cache or append the next network page.

use anyhow::{Context, Result};
use pager_client::{PagedStream, WindowSnapshot};
use pager_types::Query;
use std::time::Duration;
use tracing::{info, warn};

use super::CliPager;

/// How long one page may take to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Output options for browse and search.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Pages to scroll through (at least one is shown).
    pub pages: usize,
    /// Print the final window as JSON instead of a listing.
    pub json: bool,
}

/// Run the browse or search command.
pub async fn run(pager: &CliPager, query: Query, options: Options) -> Result<()> {
    info!(query = %query, pages = options.pages, "browsing");
    let mut stream = pager.open_stream(query).await;

    let mut snapshot = settle(&mut stream, |_| true).await?;
    let mut printed = 0;
    if !options.json {
        printed = print_items(&snapshot, printed);
    }

    for _ in 1..options.pages {
        if is_finished(&snapshot) {
            break;
        }
        let Some(last) = snapshot.last_index() else {
            break;
        };
        let before = snapshot.end();
        stream.access(last);
        snapshot = settle(&mut stream, |s| s.end() > before || is_finished(s)).await?;
        if !options.json {
            printed = print_items(&snapshot, printed);
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_footer(&snapshot);
    }

    if let Some((direction, failure)) = snapshot.load_states.first_error() {
        if snapshot.total == 0 {
            anyhow::bail!("{} failed: {}", direction, failure);
        }
        warn!(%direction, %failure, "showing cached items only");
    }
    Ok(())
}

/// Nothing more will arrive without a retry.
fn is_finished(snapshot: &WindowSnapshot) -> bool {
    let states = &snapshot.load_states;
    states.first_error().is_some()
        || (states.is_exhausted_at_end() && snapshot.end() >= snapshot.total)
}

/// Wait for a snapshot with no load running that also satisfies `ready`.
async fn settle(
    stream: &mut PagedStream,
    ready: impl Fn(&WindowSnapshot) -> bool,
) -> Result<WindowSnapshot> {
    let accept = |s: &WindowSnapshot| !s.load_states.is_loading() && ready(s);
    let wait = async {
        if let Some(snapshot) = stream.latest().filter(|s| accept(s)) {
            return Some(snapshot);
        }
        while let Some(snapshot) = stream.next().await {
            if accept(&snapshot) {
                return Some(snapshot);
            }
        }
        None
    };

    tokio::time::timeout(SETTLE_TIMEOUT, wait)
        .await
        .context("Timed out waiting for items")?
        .context("Stream closed before items arrived")
}

/// Print items past absolute index `printed`; returns the new high mark.
fn print_items(snapshot: &WindowSnapshot, printed: usize) -> usize {
    for index in printed.max(snapshot.offset)..snapshot.end() {
        if let Some(item) = snapshot.get(index) {
            println!("{:>5}  {:>8}  {}", index + 1, item.id, item.name);
        }
    }
    printed.max(snapshot.end())
}

fn print_footer(snapshot: &WindowSnapshot) {
    if snapshot.is_empty_result() {
        println!("No items found.");
        return;
    }
    let more = if snapshot.load_states.is_exhausted_at_end() && snapshot.end() >= snapshot.total
    {
        "end of results"
    } else {
        "more available"
    };
    println!();
    println!(
        "Showing {} of {} cached items ({})",
        snapshot.end(),
        snapshot.total,
        more
    );
}
