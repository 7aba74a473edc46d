//! Configuration schema for texbundle
//!
//! Configuration is stored at `~/.config/texbundle/config.toml`

use crate::digest::Digest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Hard cap on prefetch worker threads
pub const MAX_WORKERS: usize = 16;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which bundle to serve
    pub bundle: BundleConfig,

    /// HTTP behaviour
    pub network: NetworkConfig,

    /// Local cache settings
    pub cache: CacheConfig,
}

/// Bundle location and version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Data URL of the packed bundle (range requests go here)
    pub url: String,

    /// URL of the gzip-compressed bundle index
    pub index_url: String,

    /// Digest of the active bundle version
    pub digest: Option<Digest>,
}

/// Network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Attempts per request before giving up
    pub attempts: u32,

    /// Sleep between attempts, in milliseconds
    pub retry_delay_ms: u64,

    /// Per-request transport timeout, in seconds
    pub timeout_secs: u64,

    /// Upper bound on prefetch workers (never above 16)
    pub max_concurrency: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay_ms: 500,
            timeout_secs: 60,
            max_concurrency: MAX_WORKERS,
        }
    }
}

impl NetworkConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective worker cap: configured value clamped to `1..=MAX_WORKERS`
    pub fn worker_cap(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_WORKERS)
    }
}

/// Cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root override (defaults to the OS cache directory)
    pub dir: Option<PathBuf>,

    /// Ignore cached redirect targets older than this many days
    pub redirect_max_age_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.network.attempts, 3);
        assert_eq!(config.network.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.network.worker_cap(), 16);
        assert!(config.bundle.digest.is_none());
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
[bundle]
url = "https://example.org/bundle.tar"
digest = "0000000000000000000000000000000000000000000000000000000000000000"

[network]
attempts = 5
max_concurrency = 64
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bundle.url, "https://example.org/bundle.tar");
        assert!(config.bundle.index_url.is_empty());
        assert_eq!(config.network.attempts, 5);
        assert_eq!(config.network.retry_delay_ms, 500);
        assert_eq!(config.network.worker_cap(), MAX_WORKERS);
    }

    #[test]
    fn parse_rejects_bad_digest() {
        let toml_str = r#"
[bundle]
digest = "not-a-digest"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn worker_cap_never_zero() {
        let net = NetworkConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert_eq!(net.worker_cap(), 1);
    }
}
