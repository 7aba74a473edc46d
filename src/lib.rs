//! texbundle - TeX resource bundle fetcher
//!
//! Resolves resources from a packed, versioned TeX bundle. Natively the
//! bytes come over HTTP range requests into a content-addressed disk
//! cache; in a WASM build every fetch is delegated to the embedding JS
//! host.

pub mod bundle;
#[cfg(not(target_arch = "wasm32"))]
pub mod cache;
#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod host;

pub use bundle::{BundleStore, IndexEntry};
pub use digest::Digest;
pub use error::{BundleError, BundleResult};
pub use host::{CacheStatus, Host, PlatformHost, SeedItem, SeedResult, World};
