//! Manifest persistence
//!
//! The manifest maps resource names to the content hash they were stored
//! under. It is kept as JSON lines so a damaged record costs one entry, not
//! the whole cache.

use crate::cache::layout::atomic_write;
use crate::error::{BundleError, BundleResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// One persisted `name -> hash` record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestRecord {
    name: String,
    hash: String,
}

/// In-memory `name -> content hash` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest, treating a missing file as empty
    ///
    /// Lines that fail to parse, or carry something other than a SHA-256
    /// hex hash, are skipped with a warning.
    pub fn load(path: &Path) -> BundleResult<Self> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(BundleError::io(
                    format!("reading manifest {}", path.display()),
                    e,
                ))
            }
        };

        let mut manifest = Self::new();
        let mut skipped = 0usize;

        for (lineno, line) in content.split(|&b| b == b'\n').enumerate() {
            let line = match std::str::from_utf8(line) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("{}:{}: manifest line is not UTF-8: {}", path.display(), lineno + 1, e);
                    skipped += 1;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<ManifestRecord>(line) {
                Ok(record) if is_content_hash(&record.hash) && !record.name.is_empty() => {
                    manifest.entries.insert(record.name, record.hash);
                }
                Ok(_) => {
                    warn!("{}:{}: invalid manifest record, skipping", path.display(), lineno + 1);
                    skipped += 1;
                }
                Err(e) => {
                    warn!("{}:{}: corrupt manifest line: {}", path.display(), lineno + 1, e);
                    skipped += 1;
                }
            }
        }

        debug!(
            "Loaded {} manifest entries from {} ({} skipped)",
            manifest.len(),
            path.display(),
            skipped
        );
        Ok(manifest)
    }

    /// Atomically replace the manifest file with the current entries
    pub fn save(&self, path: &Path) -> BundleResult<()> {
        let mut out = String::new();
        for (name, hash) in &self.entries {
            let record = ManifestRecord {
                name: name.clone(),
                hash: hash.clone(),
            };
            out.push_str(&serde_json::to_string(&record)?);
            out.push('\n');
        }

        atomic_write(path, out.as_bytes())?;
        debug!("Saved {} manifest entries to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(name.into(), hash.into());
    }

    /// Merge `other` into this manifest; `other` wins on conflicts
    pub fn extend(&mut self, other: Manifest) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_content_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
