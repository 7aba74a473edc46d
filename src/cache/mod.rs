//! Content-addressed resource cache
//!
//! Resource bytes live at a path derived from their SHA-256 hash, so every
//! stored file verifies itself. A per-digest manifest maps resource names to
//! those hashes.
//!
//! # Concurrency
//!
//! Manifest mutation is serialized by a single mutex. File writes go to
//! hash-derived paths that never alias between different contents, so they
//! run without the lock; two writers racing on the same hash both rename
//! identical bytes into place.
//!
//! # Lifecycle
//!
//! | Step | When |
//! |------|------|
//! | load manifest | once, at [`Cache::load`] |
//! | write entry | per fetched resource, in memory + file |
//! | save manifest | explicitly, via [`Cache::save_manifest`] |
//!
//! Nothing is evicted.

pub mod layout;
pub mod manifest;

pub use layout::{detect_cache_dir, CacheLayout, CACHE_DIR_ENV};
pub use manifest::Manifest;

use crate::digest::Digest;
use crate::error::{BundleError, BundleResult};
use sha2::{Digest as _, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// SHA-256 of `content` as lowercase hex
pub fn hash_content(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Disk-backed content-addressed store for one bundle digest
#[derive(Debug)]
pub struct Cache {
    layout: CacheLayout,
    digest: Digest,
    manifest: Mutex<Manifest>,
    flushes: AtomicUsize,
}

impl Cache {
    /// Create the directory layout and eagerly load the digest's manifest
    pub fn load(layout: CacheLayout, digest: Digest) -> BundleResult<Self> {
        layout.ensure_dirs()?;

        let cache = Self {
            layout,
            digest,
            manifest: Mutex::new(Manifest::new()),
            flushes: AtomicUsize::new(0),
        };
        let path = cache.layout.manifest_path(&cache.digest);
        let loaded = cache.load_manifest(&path)?;
        debug!(
            "Cache {} ready for bundle {} ({} entries)",
            cache.layout.root().display(),
            cache.digest.short(),
            loaded
        );
        Ok(cache)
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    fn manifest(&self) -> MutexGuard<'_, Manifest> {
        self.manifest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Merge the manifest at `path` into memory, returning the entry count
    pub fn load_manifest(&self, path: &Path) -> BundleResult<usize> {
        let loaded = Manifest::load(path)?;
        let mut manifest = self.manifest();
        manifest.extend(loaded);
        Ok(manifest.len())
    }

    /// Persist the manifest with atomic replace
    pub fn save_manifest(&self) -> BundleResult<()> {
        let manifest = self.manifest();
        manifest.save(&self.layout.manifest_path(&self.digest))?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of successful manifest saves in this process
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Hash recorded for `name`, if any
    pub fn hash_of(&self, name: &str) -> Option<String> {
        self.manifest().get(name).map(str::to_string)
    }

    /// Whether `name` is recorded and its file is present
    ///
    /// A recorded name whose file vanished reports false, so the caller
    /// refetches and the next write repairs the entry.
    pub fn has(&self, name: &str) -> bool {
        match self.hash_of(name) {
            Some(hash) => self.layout.file_path(&hash).is_file(),
            None => false,
        }
    }

    /// Read and verify the bytes stored for `name`
    pub fn open(&self, name: &str) -> Option<Vec<u8>> {
        let hash = self.hash_of(name)?;
        let path = self.layout.file_path(&hash);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache file for {} missing at {}", name, path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read cached {}: {}", name, e);
                return None;
            }
        };

        let actual = hash_content(&content);
        if actual != hash {
            warn!(
                "Cached {} is corrupt (expected {}, got {}), ignoring",
                name, hash, actual
            );
            return None;
        }

        Some(content)
    }

    /// Store `content` under its hash and record `name -> hash`
    ///
    /// `hash` must be the hash of `content`; a mismatch is rejected before
    /// anything touches the disk.
    pub fn write(&self, name: &str, hash: &str, content: &[u8]) -> BundleResult<()> {
        let actual = hash_content(content);
        if actual != hash {
            return Err(BundleError::IntegrityMismatch {
                name: name.to_string(),
                expected: hash.to_string(),
                actual,
            });
        }

        let path = self.layout.file_path(hash);
        match fs::read(&path) {
            Ok(existing) if hash_content(&existing) == hash => {
                debug!("{} already stored as {}", name, &hash[..12]);
            }
            Ok(_) => {
                warn!("Replacing corrupt cache file {}", path.display());
                layout::atomic_write(&path, content)?;
            }
            Err(_) => layout::atomic_write(&path, content)?,
        }

        self.manifest().insert(name, hash);
        Ok(())
    }

    /// Hash `content` and write it, returning the hash
    pub fn store(&self, name: &str, content: &[u8]) -> BundleResult<String> {
        let hash = hash_content(content);
        self.write(name, &hash, content)?;
        Ok(hash)
    }

    /// Number of manifest entries
    pub fn count(&self) -> usize {
        self.manifest().len()
    }

    /// Copy of the current manifest
    pub fn snapshot(&self) -> Manifest {
        self.manifest().clone()
    }
}
