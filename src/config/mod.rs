//! Configuration management for texbundle

pub mod schema;

pub use schema::Config;

use crate::digest::Digest;
use crate::error::{BundleError, BundleResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        #[cfg(not(target_arch = "wasm32"))]
        let base = dirs::config_dir();
        #[cfg(target_arch = "wasm32")]
        let base: Option<PathBuf> = None;

        base.unwrap_or_else(|| PathBuf::from("."))
            .join("texbundle")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if the file is absent
    pub fn load(&self) -> BundleResult<Config> {
        if !self.config_path.exists() {
            debug!(
                "Config file {} not found, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        Self::load_from_file(&self.config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> BundleResult<Config> {
        let content = fs::read_to_string(path)
            .map_err(|e| BundleError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| BundleError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Check that everything a network-facing command needs is present
    pub fn validate(&self, path: &Path) -> BundleResult<()> {
        let invalid = |reason: &str| BundleError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if self.bundle.url.is_empty() {
            return Err(invalid("bundle.url is not set"));
        }
        if self.bundle.index_url.is_empty() {
            return Err(invalid("bundle.index_url is not set"));
        }
        if self.bundle.digest.is_none() {
            return Err(invalid("bundle.digest is not set"));
        }
        if self.network.attempts == 0 {
            return Err(invalid("network.attempts must be at least 1"));
        }
        Ok(())
    }

    /// The configured digest, or an error naming the missing key
    pub fn digest(&self) -> BundleResult<&Digest> {
        self.bundle.digest.as_ref().ok_or_else(|| {
            BundleError::Format("bundle.digest is not configured".to_string())
        })
    }
}
