//! Native host: HTTP, OS threads and a disk cache
//!
//! A `NativeHost` is constructed once per process and owns everything the
//! fetch path needs: the configured URLs, the content-addressed cache, a
//! connector for per-thread HTTP clients, and the resolved redirect target.
//! URLs are fixed at construction; the redirect target is set at most once.

use crate::bundle::index::decompress_index;
use crate::bundle::{BundleStore, IndexEntry};
use crate::cache::{detect_cache_dir, Cache, CacheLayout};
use crate::config::Config;
use crate::digest::Digest;
use crate::error::BundleResult;
use crate::host::http::{
    fetch_with_retry, Connector, HttpClient, HttpRequest, RetryPolicy, UreqConnector,
};
use crate::host::redirect::RedirectRecord;
use crate::host::seed;
use crate::host::{CacheStatus, Host, SeedItem, SeedResult, World};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::{debug, info, warn};

/// Threaded, disk-backed host
pub struct NativeHost {
    digest: Digest,
    data_url: String,
    index_url: String,
    policy: RetryPolicy,
    worker_cap: usize,
    cache: Cache,
    connector: Box<dyn Connector>,
    client: Mutex<Box<dyn HttpClient>>,
    resolved_url: OnceLock<String>,
}

impl NativeHost {
    /// Create a host that talks HTTP through `ureq`
    pub fn new(config: &Config, cache_root: &Path) -> BundleResult<Self> {
        let connector = UreqConnector::from(&config.network);
        Self::with_connector(config, cache_root, Box::new(connector))
    }

    /// Create a host over an arbitrary connector
    pub fn with_connector(
        config: &Config,
        cache_root: &Path,
        connector: Box<dyn Connector>,
    ) -> BundleResult<Self> {
        let digest = config.digest()?.clone();
        let cache = Cache::load(CacheLayout::new(cache_root), digest.clone())?;

        let max_age = config
            .cache
            .redirect_max_age_days
            .map(|days| chrono::Duration::days(i64::from(days)));
        let resolved_url = OnceLock::new();
        if let Some(record) = RedirectRecord::load(&cache.layout().redirect_path(&digest), max_age) {
            let _ = resolved_url.set(record.url);
        }

        let client = Mutex::new(connector.connect());

        Ok(Self {
            digest,
            data_url: config.bundle.url.clone(),
            index_url: config.bundle.index_url.clone(),
            policy: RetryPolicy::from(&config.network),
            worker_cap: config.network.worker_cap(),
            cache,
            connector,
            client,
            resolved_url,
        })
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub(crate) fn worker_cap(&self) -> usize {
        self.worker_cap
    }

    pub(crate) fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// URL range requests go to: the cached redirect target if known
    pub fn data_url(&self) -> &str {
        self.resolved_url
            .get()
            .map(String::as_str)
            .unwrap_or(&self.data_url)
    }

    /// Fetch one range with `client`, recording a first redirect
    pub(crate) fn fetch_with(
        &self,
        client: &mut dyn HttpClient,
        name: &str,
        entry: IndexEntry,
    ) -> BundleResult<Vec<u8>> {
        if entry.length == 0 {
            return Ok(Vec::new());
        }
        let url = self.data_url();
        debug!("Fetching {} ({} bytes at {})", name, entry.length, entry.offset);

        let fetched = fetch_with_retry(client, &HttpRequest::range(url, entry), &self.policy)?;
        if let Some(target) = fetched.redirected_to {
            self.note_redirect(target);
        }
        Ok(fetched.body)
    }

    fn note_redirect(&self, target: String) {
        if self.resolved_url.get().is_some() {
            return;
        }
        if self.resolved_url.set(target.clone()).is_err() {
            // Another worker got there first.
            return;
        }

        info!("Bundle URL redirects to {}", target);
        let path = self.cache.layout().redirect_path(&self.digest);
        if let Err(e) = RedirectRecord::new(target).store(&path) {
            warn!("Failed to record redirect target: {}", e);
        }
    }

    /// Fetch and cache one seed item unless it is already cached
    pub(crate) fn seed_one(&self, client: &mut dyn HttpClient, item: &SeedItem) -> BundleResult<()> {
        if self.cache.has(&item.name) {
            return Ok(());
        }
        let content = self.fetch_with(client, &item.name, item.entry)?;
        self.cache_write(&item.name, &content);
        Ok(())
    }

    fn client(&self) -> std::sync::MutexGuard<'_, Box<dyn HttpClient>> {
        self.client.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Host for NativeHost {
    fn fetch_range(&self, name: &str, entry: IndexEntry) -> BundleResult<Vec<u8>> {
        let mut client = self.client();
        self.fetch_with(client.as_mut(), name, entry)
    }

    fn cache_check(&self, name: &str) -> CacheStatus {
        if self.cache.has(name) {
            CacheStatus::Hit
        } else {
            CacheStatus::Miss
        }
    }

    fn cache_open(&self, name: &str) -> Option<Vec<u8>> {
        self.cache.open(name)
    }

    fn cache_write(&self, name: &str, content: &[u8]) {
        if let Err(e) = self.cache.store(name, content) {
            warn!("Failed to cache {}: {}", name, e);
        }
    }

    fn cache_save(&self) -> BundleResult<()> {
        self.cache.save_manifest()
    }

    fn cache_count(&self) -> usize {
        self.cache.count()
    }

    fn batch_seed(&self, items: &[SeedItem], concurrency: usize) -> SeedResult {
        if items.is_empty() {
            return SeedResult::default();
        }

        let result = seed::run(self, items, concurrency);

        if let Err(e) = self.cache_save() {
            warn!("Failed to save cache manifest after prefetch: {}", e);
        }
        result
    }

    fn fetch_index(&self) -> BundleResult<Vec<u8>> {
        info!("Downloading bundle index from {}", self.index_url);
        let fetched = {
            let mut client = self.client();
            fetch_with_retry(
                client.as_mut(),
                &HttpRequest::whole(&self.index_url),
                &self.policy,
            )?
        };
        decompress_index(&fetched.body)
    }

    fn cache_index(&self, digest: &Digest, content: &[u8]) {
        let path = self.cache.layout().index_path(digest);
        match crate::cache::layout::atomic_write(&path, content) {
            Ok(()) => debug!("Cached index for {} at {}", digest.short(), path.display()),
            Err(e) => warn!("Failed to cache bundle index: {}", e),
        }
    }

    fn load_cached_index(&self, digest: &Digest) -> Option<Vec<u8>> {
        let path = self.cache.layout().index_path(digest);
        match fs::read(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read cached index {}: {}", path.display(), e);
                None
            }
        }
    }

    fn setup(
        world: &mut World<Self>,
        config: &Config,
        verbose: bool,
        cache_dir_override: Option<&Path>,
    ) -> BundleResult<Option<PathBuf>> {
        let root = cache_dir_override
            .map(Path::to_path_buf)
            .or_else(|| config.cache.dir.clone())
            .unwrap_or_else(detect_cache_dir);

        let host = Self::new(config, &root)?;
        if verbose {
            info!(
                "Bundle cache at {} ({} entries)",
                root.display(),
                host.cache_count()
            );
        }

        let digest = host.digest.clone();
        world.bundle = Some(BundleStore::new(host, Some(digest)));
        Ok(Some(root))
    }

    fn platform(&self) -> &'static str {
        "native"
    }
}

impl std::fmt::Debug for NativeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHost")
            .field("digest", &self.digest)
            .field("data_url", &self.data_url())
            .field("cache", &self.cache.layout().root())
            .finish_non_exhaustive()
    }
}
