//! Fetch command - resolve one resource

use crate::cli::args::FetchArgs;
use crate::cli::commands::Context;
use crate::error::{BundleError, BundleResult};
use crate::host::Host;
use console::style;
use std::fs;
use std::io::{self, Write};
use tracing::warn;

/// Execute the fetch command
pub fn execute(args: FetchArgs, ctx: &Context) -> BundleResult<()> {
    let store = ctx.open_loaded_store()?;
    let content = store.open(&args.name)?;

    if let Err(e) = store.host().cache_save() {
        warn!("Failed to save cache manifest: {}", e);
    }

    match args.output {
        Some(path) => {
            fs::write(&path, &content)
                .map_err(|e| BundleError::io(format!("writing {}", path.display()), e))?;
            eprintln!(
                "{} {} ({} bytes) -> {}",
                style("Fetched").green(),
                args.name,
                content.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&content)
                .and_then(|()| stdout.flush())
                .map_err(|e| BundleError::io("writing to stdout", e))?;
        }
    }

    Ok(())
}
