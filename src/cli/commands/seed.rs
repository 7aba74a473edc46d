//! Seed command - prefetch resources into the cache

use crate::cli::args::SeedArgs;
use crate::cli::commands::Context;
use crate::error::BundleResult;
use console::style;

/// Execute the seed command
pub fn execute(args: SeedArgs, ctx: &Context) -> BundleResult<()> {
    let store = ctx.open_loaded_store()?;
    let jobs = args.jobs.unwrap_or(ctx.config.network.max_concurrency);

    let result = if args.all {
        let names = store.names();
        store.prefetch(&names, jobs)?
    } else {
        store.prefetch(&args.names, jobs)?
    };

    let failed = if result.failed > 0 {
        style(result.failed).red().bold()
    } else {
        style(result.failed).green()
    };
    println!(
        "Prefetched {} of {} resources ({} failed)",
        style(result.fetched).green().bold(),
        result.total(),
        failed
    );
    Ok(())
}
