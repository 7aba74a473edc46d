//! Host abstraction
//!
//! The engine never talks to the network or the disk directly. Everything
//! goes through a [`Host`], of which there are two:
//!
//! - native: HTTP range requests with retry, a threaded prefetch pool and a
//!   content-addressed disk cache;
//! - wasm: every fetch is delegated to the embedding JS host, which owns
//!   caching; batch operations run sequentially.
//!
//! Which one is used is decided at compile time through [`PlatformHost`].

#[cfg(not(target_arch = "wasm32"))]
pub mod http;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(not(target_arch = "wasm32"))]
mod redirect;
#[cfg(not(target_arch = "wasm32"))]
mod seed;
pub mod wasm;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub(crate) mod testing;

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeHost;
#[cfg(not(target_arch = "wasm32"))]
pub use redirect::RedirectRecord;
pub use wasm::{JsBridge, WasmHost};

use crate::bundle::{BundleStore, IndexEntry};
use crate::config::Config;
use crate::digest::Digest;
use crate::error::BundleResult;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Host implementation for the current compile target
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformHost = NativeHost;

/// Host implementation for the current compile target
#[cfg(target_arch = "wasm32")]
pub type PlatformHost = WasmHost<wasm::ExternBridge>;

/// Result of probing the cache for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Stored locally and present on disk
    Hit,
    /// Not stored (or the stored file went missing)
    Miss,
    /// This host has no cache authority; do not rely on caching
    Unsupported,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// One prefetch work unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedItem {
    pub name: String,
    pub entry: IndexEntry,
}

impl SeedItem {
    pub fn new(name: impl Into<String>, entry: IndexEntry) -> Self {
        Self {
            name: name.into(),
            entry,
        }
    }
}

/// Outcome counters of a batch prefetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub fetched: usize,
    pub failed: usize,
}

impl SeedResult {
    pub fn total(&self) -> usize {
        self.fetched + self.failed
    }
}

/// Engine-side state that `setup` populates
pub struct World<H: Host> {
    pub bundle: Option<BundleStore<H>>,
}

impl<H: Host> World<H> {
    pub fn new() -> Self {
        Self { bundle: None }
    }
}

impl<H: Host> Default for World<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform services the bundle store depends on
///
/// Network operations block the calling thread. Cache operations on hosts
/// without cache authority degrade to `Unsupported` / `None` / no-op rather
/// than failing.
pub trait Host: Sized {
    /// Fetch exactly `entry.length` bytes at `entry.offset`
    fn fetch_range(&self, name: &str, entry: IndexEntry) -> BundleResult<Vec<u8>>;

    /// Probe the local cache for `name`
    fn cache_check(&self, name: &str) -> CacheStatus;

    /// Cached bytes for `name`, if present and intact
    fn cache_open(&self, name: &str) -> Option<Vec<u8>>;

    /// Store fetched bytes; failures are logged, never returned
    fn cache_write(&self, name: &str, content: &[u8]);

    /// Persist cache bookkeeping
    fn cache_save(&self) -> BundleResult<()>;

    /// Number of cached resources
    fn cache_count(&self) -> usize;

    /// Prefetch `items`, tolerating per-item failures
    ///
    /// Persists cache bookkeeping exactly once when the batch is non-empty.
    fn batch_seed(&self, items: &[SeedItem], concurrency: usize) -> SeedResult;

    /// Download and decompress the bundle index
    fn fetch_index(&self) -> BundleResult<Vec<u8>>;

    /// Keep a decompressed index for later runs
    fn cache_index(&self, digest: &Digest, content: &[u8]);

    /// A previously cached decompressed index
    fn load_cached_index(&self, digest: &Digest) -> Option<Vec<u8>>;

    /// Construct the host, install a bundle store into `world`, and return
    /// the cache directory in use (if the host has one)
    fn setup(
        world: &mut World<Self>,
        config: &Config,
        verbose: bool,
        cache_dir_override: Option<&Path>,
    ) -> BundleResult<Option<PathBuf>>;

    /// Short platform name for diagnostics
    fn platform(&self) -> &'static str;
}
