//! Bundle index parsing
//!
//! The index maps each resource name to its byte window inside the packed
//! bundle. It is served gzip-compressed; the decompressed form is one record
//! per line:
//!
//! ```text
//! plain.tex 1536 29201
//! cmr10.tfm 30720 1296
//! ```

use crate::error::{BundleError, BundleResult};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Read};

/// Location of a resource inside the bundle's packed byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub offset: u64,
    pub length: u32,
}

impl IndexEntry {
    pub fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }

    /// Offset of the last byte (inclusive)
    pub fn last_byte(&self) -> BundleResult<u64> {
        if self.length == 0 {
            return Err(BundleError::Format(format!(
                "empty range at offset {}",
                self.offset
            )));
        }
        self.offset
            .checked_add(u64::from(self.length) - 1)
            .ok_or_else(|| {
                BundleError::Format(format!(
                    "range {}+{} overflows",
                    self.offset, self.length
                ))
            })
    }

    /// `Range` header value for this entry
    pub fn range_header(&self) -> BundleResult<String> {
        Ok(format!("bytes={}-{}", self.offset, self.last_byte()?))
    }
}

/// Parsed bundle index
pub type Index = HashMap<String, IndexEntry>;

/// Gunzip a downloaded index
pub fn decompress_index(compressed: &[u8]) -> BundleResult<Vec<u8>> {
    if compressed.is_empty() {
        return Err(BundleError::Decompress(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty index download",
        )));
    }

    let mut out = Vec::new();
    GzDecoder::new(compressed)
        .read_to_end(&mut out)
        .map_err(BundleError::Decompress)?;
    Ok(out)
}

/// Parse decompressed index text
///
/// Blank lines are ignored; a later record for the same name replaces an
/// earlier one.
pub fn parse_index(content: &[u8]) -> BundleResult<Index> {
    let text = std::str::from_utf8(content)
        .map_err(|e| BundleError::Format(format!("bundle index is not UTF-8: {}", e)))?;

    let mut index = Index::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let bad = |what: &str| {
            BundleError::Format(format!("bundle index line {}: {}", lineno + 1, what))
        };

        let mut fields = line.split_whitespace();
        let (Some(name), Some(offset), Some(length), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(bad("expected '<name> <offset> <length>'"));
        };

        let offset: u64 = offset.parse().map_err(|_| bad("invalid offset"))?;
        let length: u32 = length.parse().map_err(|_| bad("invalid length"))?;

        index.insert(name.to_string(), IndexEntry::new(offset, length));
    }

    Ok(index)
}
