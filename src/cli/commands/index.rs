//! Index command - load the bundle index

use crate::cli::commands::Context;
use crate::error::BundleResult;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");

/// Execute the index command
pub fn execute(ctx: &Context) -> BundleResult<()> {
    let store = ctx.open_loaded_store()?;

    let digest = store
        .digest()
        .map(|d| d.short().to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}Bundle {}: {} entries",
        CHECK,
        style(digest).cyan(),
        store.len()
    );
    Ok(())
}
