//! texbundle - TeX resource bundle fetcher
//!
//! CLI entry point that dispatches to subcommands.

#[cfg(not(target_arch = "wasm32"))]
use {
    clap::Parser,
    console::style,
    std::process::ExitCode,
    texbundle::cli::commands::{self, Context},
    texbundle::cli::{Cli, Commands},
    texbundle::config::ConfigManager,
    texbundle::error::BundleResult,
    tracing::debug,
    tracing_subscriber::EnvFilter,
};

/// The CLI is native-only; wasm32 builds use `--lib`.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> BundleResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("texbundle=warn"),
        1 => EnvFilter::new("texbundle=info"),
        _ => EnvFilter::new("texbundle=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config_manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    debug!("Using config {}", config_manager.path().display());
    let config = config_manager.load()?;

    let ctx = Context {
        config,
        config_path: config_manager.path().to_path_buf(),
        cache_dir: cli.cache_dir,
        verbose: cli.verbose > 0,
    };

    match cli.command {
        Commands::Index => commands::index(&ctx),
        Commands::Fetch(args) => commands::fetch(args, &ctx),
        Commands::Seed(args) => commands::seed(args, &ctx),
        Commands::Status(args) => commands::status(args, &ctx),
    }
}
