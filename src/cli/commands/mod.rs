//! CLI command implementations

pub mod fetch;
pub mod index;
pub mod seed;
pub mod status;

pub use fetch::execute as fetch;
pub use index::execute as index;
pub use seed::execute as seed;
pub use status::execute as status;

use crate::bundle::BundleStore;
use crate::cache::detect_cache_dir;
use crate::config::Config;
use crate::error::{BundleError, BundleResult};
use crate::host::{Host, PlatformHost, World};
use std::path::PathBuf;

/// Settings shared by every command
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Context {
    /// Cache root in effect: flag, then config, then discovery
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| self.config.cache.dir.clone())
            .unwrap_or_else(detect_cache_dir)
    }

    /// Validate config and set up the host with its bundle store
    pub fn open_store(&self) -> BundleResult<BundleStore<PlatformHost>> {
        self.config.validate(&self.config_path)?;

        let mut world = World::new();
        PlatformHost::setup(
            &mut world,
            &self.config,
            self.verbose,
            self.cache_dir.as_deref(),
        )?;
        world
            .bundle
            .ok_or_else(|| BundleError::Format("host did not install a bundle store".to_string()))
    }

    /// Open the store and load its index
    pub fn open_loaded_store(&self) -> BundleResult<BundleStore<PlatformHost>> {
        let mut store = self.open_store()?;
        store.load_index()?;
        Ok(store)
    }
}
