//! Name-to-bytes resolution over a [`Host`]
//!
//! A [`BundleStore`] owns the host and the parsed index for one bundle
//! version. Lookups go index, then cache, then network:
//!
//! | Cache status | Action |
//! |--------------|--------|
//! | hit | read from cache, fetch if the cached file is gone or corrupt |
//! | miss | fetch, then store |
//! | unsupported | fetch only |

pub mod index;

pub use index::{decompress_index, parse_index, Index, IndexEntry};

use crate::digest::Digest;
use crate::error::{BundleError, BundleResult};
use crate::host::{CacheStatus, Host, SeedItem, SeedResult};
use tracing::{debug, info, warn};

/// Resource resolver for one bundle version
pub struct BundleStore<H: Host> {
    host: H,
    digest: Option<Digest>,
    index: Option<Index>,
}

impl<H: Host> BundleStore<H> {
    /// Wrap a host; without a digest the index is never cached
    pub fn new(host: H, digest: Option<Digest>) -> Self {
        Self {
            host,
            digest,
            index: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// Load the index, preferring a copy cached for this digest
    ///
    /// Returns the number of entries.
    pub fn load_index(&mut self) -> BundleResult<usize> {
        if let Some(index) = self.cached_index() {
            let count = index.len();
            self.index = Some(index);
            return Ok(count);
        }

        let content = self.host.fetch_index()?;
        let index = parse_index(&content)?;
        if let Some(digest) = &self.digest {
            self.host.cache_index(digest, &content);
        }

        info!("Loaded bundle index with {} entries", index.len());
        let count = index.len();
        self.index = Some(index);
        Ok(count)
    }

    fn cached_index(&self) -> Option<Index> {
        let digest = self.digest.as_ref()?;
        let content = self.host.load_cached_index(digest)?;
        match parse_index(&content) {
            Ok(index) => {
                debug!(
                    "Using cached index for {} ({} entries)",
                    digest.short(),
                    index.len()
                );
                Some(index)
            }
            Err(e) => {
                warn!("Cached index for {} is unusable: {}", digest.short(), e);
                None
            }
        }
    }

    fn index(&self) -> BundleResult<&Index> {
        self.index.as_ref().ok_or(BundleError::IndexNotLoaded)
    }

    /// Location of `name` in the bundle
    pub fn entry(&self, name: &str) -> BundleResult<IndexEntry> {
        self.index()?
            .get(name)
            .copied()
            .ok_or_else(|| BundleError::NotInIndex(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, Index::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indexed resource names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .index
            .iter()
            .flat_map(|index| index.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }

    /// Bytes of `name`, from cache when possible
    pub fn open(&self, name: &str) -> BundleResult<Vec<u8>> {
        let entry = self.entry(name)?;
        if entry.length == 0 {
            return Ok(Vec::new());
        }

        match self.host.cache_check(name) {
            CacheStatus::Hit => {
                if let Some(content) = self.host.cache_open(name) {
                    return Ok(content);
                }
                debug!("Cache entry for {} unreadable, fetching", name);
                self.fetch_and_store(name, entry)
            }
            CacheStatus::Miss => self.fetch_and_store(name, entry),
            CacheStatus::Unsupported => self.host.fetch_range(name, entry),
        }
    }

    fn fetch_and_store(&self, name: &str, entry: IndexEntry) -> BundleResult<Vec<u8>> {
        let content = self.host.fetch_range(name, entry)?;
        self.host.cache_write(name, &content);
        Ok(content)
    }

    /// Prefetch `names`; names missing from the index count as failed
    pub fn prefetch<S: AsRef<str>>(
        &self,
        names: &[S],
        concurrency: usize,
    ) -> BundleResult<SeedResult> {
        let index = self.index()?;

        let mut unknown = 0;
        let items: Vec<SeedItem> = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                match index.get(name) {
                    Some(entry) => Some(SeedItem::new(name, *entry)),
                    None => {
                        warn!("{} is not in the bundle index, skipping", name);
                        unknown += 1;
                        None
                    }
                }
            })
            .collect();

        let mut result = self.host.batch_seed(&items, concurrency);
        result.failed += unknown;
        Ok(result)
    }
}

impl<H: Host + std::fmt::Debug> std::fmt::Debug for BundleStore<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleStore")
            .field("host", &self.host)
            .field("digest", &self.digest)
            .field("entries", &self.len())
            .finish()
    }
}
