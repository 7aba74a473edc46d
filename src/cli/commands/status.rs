//! Status command - show cache and configuration state
//!
//! Read-only: nothing is created and nothing touches the network.

use crate::cache::{CacheLayout, Manifest};
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::cli::commands::Context;
use crate::error::BundleResult;
use crate::host::RedirectRecord;
use console::{style, Emoji};
use serde::Serialize;
use std::path::PathBuf;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[--] ");

/// Snapshot printed by `texbundle status`
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub bundle_url: String,
    pub digest: Option<String>,
    pub entries: usize,
    pub index_cached: bool,
    pub redirect: Option<String>,
}

impl StatusReport {
    pub fn collect(ctx: &Context) -> BundleResult<Self> {
        let layout = CacheLayout::new(ctx.cache_root());
        let digest = ctx.config.bundle.digest.as_ref();

        let (entries, index_cached, redirect) = match digest {
            Some(digest) => (
                Manifest::load(&layout.manifest_path(digest))?.len(),
                layout.index_path(digest).is_file(),
                RedirectRecord::load(&layout.redirect_path(digest), None).map(|r| r.url),
            ),
            None => (0, false, None),
        };

        Ok(Self {
            config_path: ctx.config_path.clone(),
            cache_dir: layout.root().to_path_buf(),
            bundle_url: ctx.config.bundle.url.clone(),
            digest: digest.map(ToString::to_string),
            entries,
            index_cached,
            redirect,
        })
    }
}

/// Execute the status command
pub fn execute(args: StatusArgs, ctx: &Context) -> BundleResult<()> {
    let report = StatusReport::collect(ctx)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn print_text(report: &StatusReport) {
    println!("{}", style("texbundle status").bold().cyan());
    println!();

    println!("{}", style("Configuration:").bold());
    println!("  File:   {}", report.config_path.display());
    if report.bundle_url.is_empty() {
        println!("  {}{}", CROSS, style("bundle.url is not set").yellow());
    } else {
        println!("  URL:    {}", report.bundle_url);
    }
    match &report.digest {
        Some(digest) => println!("  Digest: {}", digest),
        None => println!("  {}{}", CROSS, style("bundle.digest is not set").yellow()),
    }

    println!();
    println!("{}", style("Cache:").bold());
    println!("  Root:    {}", report.cache_dir.display());
    println!("  Entries: {}", report.entries);
    if report.index_cached {
        println!("  {}Index cached", CHECK);
    } else {
        println!("  {}Index not cached", CROSS);
    }
    match &report.redirect {
        Some(url) => println!("  {}Redirect: {}", CHECK, url),
        None => println!("  {}No redirect recorded", CROSS),
    }
}
