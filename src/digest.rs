//! Bundle version identifiers
//!
//! A bundle is identified by the SHA-256 digest of its contents. The digest
//! partitions every per-version artifact on disk: manifests, decompressed
//! indexes and redirect records.

use crate::error::{BundleError, BundleResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Identifier of the active bundle version (64 lowercase hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse a hex digest, normalizing to lowercase
    pub fn parse(s: &str) -> BundleResult<Self> {
        let s = s.trim();
        if s.len() != DIGEST_HEX_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BundleError::Format(format!(
                "bundle digest must be {} hex characters, got '{}'",
                DIGEST_HEX_LEN, s
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Digest of arbitrary bytes
    pub fn of(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = BundleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}
