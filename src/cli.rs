use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default revalidation interval for `watch`, matching the current
/// conditions TTL
pub const DEFAULT_WATCH_SECS: u64 = 300;

#[derive(Parser, Debug)]
#[command(name = "citycast", version, about = "Weather for your saved cities")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Path to config.toml (defaults to the user config dir)")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List saved cities in display order
    List,
    /// Look up a city and save it
    Add { name: String },
    /// Remove a saved city by name or id
    Remove { city: String },
    /// Move a city from one position to another (1-based)
    Move {
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        from: u16,
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        to: u16,
    },
    /// Select a city and show its dashboard
    Select { city: String },
    /// Show the dashboard for the selected (or given) city
    Show { city: Option<String> },
    /// Suggest cities matching a partial name
    Search { query: String },
    /// Keep showing the dashboard, refreshing stale data periodically
    Watch {
        city: Option<String>,
        #[arg(long, default_value_t = DEFAULT_WATCH_SECS, help = "Refresh interval in seconds")]
        interval: u64,
    },
}
