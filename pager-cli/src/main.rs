//! # pager-cli
//!
//! Browse an items API through the offline-pager cache.
//!
//! ## Commands
//!
//! - `browse`: Page through all items
//! - `search`: Page through items whose name matches a query
//! - `status`: Show what is cached
//! - `clear`: Drop cached items and cursors
//!
//! ## Example
//!
//! ```bash
//! # Three pages from the built-in demo catalogue
//! pager-cli --mock browse --pages 3
//!
//! # Search a real backend configured in pager.toml
//! pager-cli --config pager.toml search "red shoe"
//!
//! # Inspect and reset the cache
//! pager-cli status
//! pager-cli clear
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pager_types::Query;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{browse, clear, status};
use config::AppConfig;

/// Browse an items API through a local offline cache.
#[derive(Parser, Debug)]
#[command(name = "pager-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding the cache database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve pages from a built-in demo catalogue instead of HTTP
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Page through all items
    Browse {
        /// Number of pages to scroll through
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Print the final window as JSON
        #[arg(long)]
        json: bool,
    },

    /// Page through items whose name contains the query
    Search {
        /// Search text; words must appear in order
        query: String,

        /// Number of pages to scroll through
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Print the final window as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cached item and cursor counts
    Status,

    /// Clear cached items and cursors
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("offline_pager=info,pager_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let database = config.database_path(&data_dir);
    let store = commands::open_store(&database).await?;

    match cli.command {
        Commands::Browse { pages, json } => {
            let pager = commands::pager(&config, store, cli.mock)?;
            browse::run(&pager, Query::all(), browse::Options { pages, json }).await?;
        }
        Commands::Search { query, pages, json } => {
            let pager = commands::pager(&config, store, cli.mock)?;
            browse::run(&pager, Query::new(&query), browse::Options { pages, json }).await?;
        }
        Commands::Status => {
            status::run(&store, &database).await?;
        }
        Commands::Clear => {
            clear::run(&store).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for pager-cli.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "offline-pager")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
