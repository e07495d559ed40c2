//! Command-line interface for lodging-matcher.
//!
//! This module implements the CLI using clap. Every command works against a
//! JSON snapshot file (`--data`, default `lodging.json`). Available commands:
//!
//! - **suggest**: Rank hosts for a visitor, visitors for a host, or pairs for an event
//! - **score**: Score and explain one visitor/host pair
//! - **match**: Create, cancel or list matches
//! - **postulation**: List, file or review postulations
//! - **serve**: Start the JSON API server
//!
//! ## Usage
//!
//! ```text
//! # Best hosts for a visitor
//! lodging-matcher suggest visitor pos-000005
//!
//! # Best pair per visitor across an event, as JSON
//! lodging-matcher --format json suggest event fiesta-2025
//!
//! # Commit a pairing
//! lodging-matcher match create pos-000005 pos-000001
//!
//! # Serve the embedded demo event
//! lodging-matcher serve --demo --port 8080
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::store::FileStore;

pub mod commit;
pub mod postulation;
pub mod score;
pub mod suggest;

/// Snapshot file used when `--data` is not given
pub const DEFAULT_DATA_FILE: &str = "lodging.json";

#[derive(Parser)]
#[command(name = "lodging-matcher")]
#[command(version)]
#[command(about = "Match event visitors with hosts offering lodging")]
#[command(
    long_about = "lodging-matcher pairs visitor postulations with host postulations for an event.\n\nIt scores every visitor/host pair on capacity, gender, dates, children, pets, distance and amenities, suggests the best candidates, and commits chosen pairings while keeping statuses and host capacity consistent."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Snapshot file holding postulations and matches
    #[arg(short, long, global = true, default_value = DEFAULT_DATA_FILE)]
    pub data: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Suggest candidate pairings
    Suggest(suggest::SuggestArgs),

    /// Score and explain one visitor/host pair
    Score(score::ScoreArgs),

    /// Create, cancel or list matches
    Match(commit::MatchArgs),

    /// List, file or review postulations
    Postulation(postulation::PostulationArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Serve the embedded demo event from memory instead of the data file
    #[arg(long)]
    pub demo: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Open the snapshot store named by `--data`
pub(crate) fn open_store(path: &Path, verbose: bool) -> anyhow::Result<FileStore> {
    let store = FileStore::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", path.display()))?;
    if verbose {
        eprintln!(
            "Loaded {} postulations and {} matches from {}",
            store.memory().postulation_count(),
            store.memory().match_count(),
            path.display()
        );
    }
    Ok(store)
}

/// Run an async operation to completion on a fresh runtime
pub(crate) fn block_on<F: std::future::Future>(future: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(future))
}
