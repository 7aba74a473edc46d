//! Error types for texbundle
//!
//! All modules use `BundleResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bundle operations
pub type BundleResult<T> = Result<T, BundleError>;

/// All errors that can occur while resolving bundle resources
#[derive(Error, Debug)]
pub enum BundleError {
    // Network errors
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    // Input errors
    #[error("Format error: {0}")]
    Format(String),

    #[error("Failed to decompress bundle index: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("Bundle index is not loaded")]
    IndexNotLoaded,

    #[error("File not found in bundle: {0}")]
    FileNotFound(String),

    #[error("Resource not present in bundle index: {0}")]
    NotInIndex(String),

    // Cache errors
    #[error("Content hash mismatch for {name}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl BundleError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport-level network error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Check if error is retryable
    ///
    /// Only transport failures and unexpected statuses are retried; corrupt
    /// input never gets better by asking again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Http { .. })
    }

    /// HTTP status for errors that completed a round trip
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Network { .. } => Some("Check your network connection and the bundle URL"),
            Self::IndexNotLoaded => Some("Run: texbundle index"),
            Self::Decompress(_) => Some("The index download is corrupt; retry or check index_url"),
            Self::ConfigInvalid { .. } => Some("Run: texbundle status to see the active config"),
            _ => None,
        }
    }
}
