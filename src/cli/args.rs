//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// texbundle - TeX resource bundle fetcher
///
/// Resolves resources from a packed TeX bundle over HTTP range requests and
/// keeps them in a verified, content-addressed cache.
#[derive(Parser, Debug)]
#[command(name = "texbundle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TEXBUNDLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides config and TEXBUNDLE_CACHE_DIR)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the bundle index (cached or downloaded)
    Index,

    /// Resolve one resource from the bundle
    Fetch(FetchArgs),

    /// Prefetch resources into the cache
    Seed(SeedArgs),

    /// Show cache and configuration state
    Status(StatusArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Resource name as listed in the index
    pub name: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the seed command
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Resource names to prefetch
    #[arg(required_unless_present = "all")]
    pub names: Vec<String>,

    /// Prefetch every resource in the index
    #[arg(long, conflicts_with = "names")]
    pub all: bool,

    /// Parallel downloads (default: network.max_concurrency)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}
