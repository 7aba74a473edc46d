//! On-disk cache layout
//!
//! ```text
//! <root>/files/<aa>/<sha256>        content-addressed resource bytes
//! <root>/manifests/<digest>.jsonl   name -> hash records per bundle version
//! <root>/indexes/<digest>.txt       decompressed bundle index
//! <root>/redirects/<digest>.json    resolved data URL
//! ```

use crate::digest::Digest;
use crate::error::{BundleError, BundleResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Environment variable that overrides cache directory discovery
pub const CACHE_DIR_ENV: &str = "TEXBUNDLE_CACHE_DIR";

const FILES_DIR: &str = "files";
const MANIFESTS_DIR: &str = "manifests";
const INDEXES_DIR: &str = "indexes";
const REDIRECTS_DIR: &str = "redirects";

/// Discover the OS-appropriate cache root
///
/// `TEXBUNDLE_CACHE_DIR` wins, then the platform cache directory, then a
/// directory under the current working directory.
pub fn detect_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::cache_dir()
        .map(|d| d.join("texbundle"))
        .unwrap_or_else(|| PathBuf::from(".texbundle-cache"))
}

/// Paths inside a cache root
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join(MANIFESTS_DIR)
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.root.join(INDEXES_DIR)
    }

    pub fn redirects_dir(&self) -> PathBuf {
        self.root.join(REDIRECTS_DIR)
    }

    /// Content-addressed path for a hash, fanned out by its first two chars
    pub fn file_path(&self, hash: &str) -> PathBuf {
        let bucket = hash.get(..2).unwrap_or("__");
        self.files_dir().join(bucket).join(hash)
    }

    pub fn manifest_path(&self, digest: &Digest) -> PathBuf {
        self.manifests_dir().join(format!("{}.jsonl", digest))
    }

    pub fn index_path(&self, digest: &Digest) -> PathBuf {
        self.indexes_dir().join(format!("{}.txt", digest))
    }

    pub fn redirect_path(&self, digest: &Digest) -> PathBuf {
        self.redirects_dir().join(format!("{}.json", digest))
    }

    /// Create the root and every subdirectory
    pub fn ensure_dirs(&self) -> BundleResult<()> {
        let dirs = [
            self.root.clone(),
            self.files_dir(),
            self.manifests_dir(),
            self.indexes_dir(),
            self.redirects_dir(),
        ];

        for dir in &dirs {
            fs::create_dir_all(dir).map_err(|e| {
                BundleError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }
}

/// Replace `path` with `content` via a synced temp file in the same directory
///
/// Readers observe either the old file or the new one, never a prefix.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> BundleResult<()> {
    let parent = path.parent().ok_or_else(|| BundleError::PathInvalid {
        path: path.to_path_buf(),
        reason: "no parent directory".to_string(),
    })?;
    fs::create_dir_all(parent)
        .map_err(|e| BundleError::io(format!("creating directory {}", parent.display()), e))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| BundleError::io(format!("creating temp file in {}", parent.display()), e))?;
    tmp.write_all(content)
        .map_err(|e| BundleError::io(format!("writing temp file for {}", path.display()), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BundleError::io(format!("syncing temp file for {}", path.display()), e))?;
    tmp.persist(path)
        .map_err(|e| BundleError::io(format!("renaming into {}", path.display()), e.error))?;

    #[cfg(unix)]
    {
        // Durability of the rename itself; failure here leaves a valid file.
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
