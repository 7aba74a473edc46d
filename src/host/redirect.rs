//! Resolved data-URL records
//!
//! Bundle URLs usually redirect to a CDN. The first redirected fetch records
//! the final URL under the bundle digest so later runs go straight there.
//! A new digest means a new file, so a version bump never reuses a stale
//! target. Servers that move a target without a version bump are covered by
//! an optional maximum record age.

use crate::cache::layout::atomic_write;
use crate::error::BundleResult;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Persisted redirect target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRecord {
    /// Final URL the data URL resolved to
    pub url: String,

    /// When the redirect was observed
    pub resolved_at: DateTime<Utc>,
}

impl RedirectRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resolved_at: Utc::now(),
        }
    }

    /// Whether the record is older than `max_age`
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        Utc::now() - self.resolved_at > max_age
    }

    /// Read a record, ignoring missing, corrupt or expired files
    pub fn load(path: &Path, max_age: Option<Duration>) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read redirect record {}: {}", path.display(), e);
                return None;
            }
        };

        let record: Self = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring corrupt redirect record {}: {}", path.display(), e);
                return None;
            }
        };

        if let Some(max_age) = max_age {
            if record.is_older_than(max_age) {
                info!(
                    "Redirect record from {} is stale, resolving again",
                    record.resolved_at.format("%Y-%m-%d")
                );
                return None;
            }
        }

        debug!("Using cached redirect target {}", record.url);
        Some(record)
    }

    /// Persist the record with atomic replace
    pub fn store(&self, path: &Path) -> BundleResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        atomic_write(path, content.as_bytes())
    }
}
