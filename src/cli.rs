//! CLI definitions for pagelens.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pagelens CLI.
#[derive(Parser)]
#[command(name = "pagelens")]
#[command(about = "Indexed page snapshots for browser agents")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Snapshot the current page
    State {
        /// Navigate here before taking the snapshot
        #[arg(long)]
        url: Option<String>,

        /// Do not flag elements that are new since the previous snapshot
        #[arg(long)]
        no_cache: bool,

        /// Print the indexed element list instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// List open tabs
    Tabs,
}
