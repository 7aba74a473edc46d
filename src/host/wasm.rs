//! WASM host: everything is delegated to the embedding JS runtime
//!
//! The browser side owns fetching, caching and retry. This host copies the
//! buffers it is handed and reports `Unsupported` for every cache lookup.
//! Batch operations run one item at a time on the calling thread.
//!
//! The JS side is reached through a [`JsBridge`]. On `wasm32` that is
//! [`ExternBridge`], backed by two imports from the `env` module:
//!
//! ```text
//! texbundle_fetch_range(name_ptr, name_len, offset_lo, offset_hi, length,
//!                       out_ptr, out_len) -> status
//! texbundle_fetch_index(out_ptr, out_len) -> status
//! ```

use crate::bundle::{BundleStore, IndexEntry};
use crate::config::Config;
use crate::digest::Digest;
use crate::error::{BundleError, BundleResult};
use crate::host::{CacheStatus, Host, SeedItem, SeedResult, World};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const STATUS_OK: i32 = 0;
pub const STATUS_NETWORK: i32 = 1;
pub const STATUS_INDEX_NOT_LOADED: i32 = 2;
pub const STATUS_FILE_NOT_FOUND: i32 = 3;

/// A status code plus a buffer owned by the JS side
///
/// The bytes are only valid until the next bridge call.
#[derive(Debug, Clone, Copy)]
pub struct HostBuffer<'a> {
    pub status: i32,
    pub bytes: &'a [u8],
}

impl<'a> HostBuffer<'a> {
    pub fn ok(bytes: &'a [u8]) -> Self {
        Self {
            status: STATUS_OK,
            bytes,
        }
    }

    pub fn status(status: i32) -> Self {
        Self { status, bytes: &[] }
    }
}

/// Calls across the WASM boundary
pub trait JsBridge {
    fn fetch_range(&self, name: &str, offset_lo: u32, offset_hi: u32, length: u32)
        -> HostBuffer<'_>;

    fn fetch_index(&self) -> HostBuffer<'_>;
}

/// Split a 64-bit offset into (low, high) 32-bit halves
pub fn split_offset(offset: u64) -> (u32, u32) {
    (offset as u32, (offset >> 32) as u32)
}

pub fn join_offset(lo: u32, hi: u32) -> u64 {
    (u64::from(hi) << 32) | u64::from(lo)
}

/// Map a bridge status to an error; `what` names the requested resource
fn check_status(status: i32, what: &str) -> BundleResult<()> {
    match status {
        STATUS_OK => Ok(()),
        STATUS_NETWORK => Err(BundleError::network(what, "JS host reported a network failure")),
        STATUS_INDEX_NOT_LOADED => Err(BundleError::IndexNotLoaded),
        STATUS_FILE_NOT_FOUND => Err(BundleError::FileNotFound(what.to_string())),
        other => Err(BundleError::network(
            what,
            format!("JS host returned unknown status {}", other),
        )),
    }
}

/// Host that forwards every fetch to a [`JsBridge`]
#[derive(Debug, Default)]
pub struct WasmHost<B> {
    bridge: B,
}

impl<B: JsBridge> WasmHost<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }
}

impl<B: JsBridge + Default> Host for WasmHost<B> {
    fn fetch_range(&self, name: &str, entry: IndexEntry) -> BundleResult<Vec<u8>> {
        if entry.length == 0 {
            return Ok(Vec::new());
        }
        let (lo, hi) = split_offset(entry.offset);
        let buffer = self.bridge.fetch_range(name, lo, hi, entry.length);
        check_status(buffer.status, name)?;

        // Copy out before anything else can call into JS.
        let bytes = buffer.bytes.to_vec();
        if bytes.len() != entry.length as usize {
            return Err(BundleError::network(
                name,
                format!(
                    "JS host returned {} bytes, expected {}",
                    bytes.len(),
                    entry.length
                ),
            ));
        }
        Ok(bytes)
    }

    fn cache_check(&self, _name: &str) -> CacheStatus {
        CacheStatus::Unsupported
    }

    fn cache_open(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }

    fn cache_write(&self, _name: &str, _content: &[u8]) {}

    fn cache_save(&self) -> BundleResult<()> {
        Ok(())
    }

    fn cache_count(&self) -> usize {
        0
    }

    fn batch_seed(&self, items: &[SeedItem], _concurrency: usize) -> SeedResult {
        if items.is_empty() {
            return SeedResult::default();
        }

        let mut result = SeedResult::default();
        for item in items {
            match self.fetch_range(&item.name, item.entry) {
                Ok(content) => {
                    self.cache_write(&item.name, &content);
                    result.fetched += 1;
                }
                Err(e) => {
                    warn!("Prefetch of {} failed: {}", item.name, e);
                    result.failed += 1;
                }
            }
        }

        if let Err(e) = self.cache_save() {
            warn!("Failed to save cache after prefetch: {}", e);
        }
        result
    }

    fn fetch_index(&self) -> BundleResult<Vec<u8>> {
        let buffer = self.bridge.fetch_index();
        check_status(buffer.status, "bundle index")?;
        Ok(buffer.bytes.to_vec())
    }

    fn cache_index(&self, _digest: &Digest, _content: &[u8]) {}

    fn load_cached_index(&self, _digest: &Digest) -> Option<Vec<u8>> {
        None
    }

    fn setup(
        world: &mut World<Self>,
        config: &Config,
        verbose: bool,
        _cache_dir_override: Option<&Path>,
    ) -> BundleResult<Option<PathBuf>> {
        if verbose {
            debug!("Bundle access delegated to the JS host");
        }
        let host = Self::new(B::default());
        world.bundle = Some(BundleStore::new(host, config.bundle.digest.clone()));
        Ok(None)
    }

    fn platform(&self) -> &'static str {
        "wasm"
    }
}

#[cfg(target_arch = "wasm32")]
mod ffi {
    #[link(wasm_import_module = "env")]
    extern "C" {
        pub fn texbundle_fetch_range(
            name_ptr: *const u8,
            name_len: usize,
            offset_lo: u32,
            offset_hi: u32,
            length: u32,
            out_ptr: *mut *const u8,
            out_len: *mut usize,
        ) -> i32;

        pub fn texbundle_fetch_index(out_ptr: *mut *const u8, out_len: *mut usize) -> i32;
    }
}

/// Bridge over the `env` imports provided by the JS runtime
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct ExternBridge;

#[cfg(target_arch = "wasm32")]
impl ExternBridge {
    /// # Safety
    ///
    /// `ptr` must be null or point to `len` readable bytes that stay valid
    /// for the returned lifetime.
    unsafe fn host_slice<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
        if ptr.is_null() || len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(ptr, len)
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl JsBridge for ExternBridge {
    fn fetch_range(
        &self,
        name: &str,
        offset_lo: u32,
        offset_hi: u32,
        length: u32,
    ) -> HostBuffer<'_> {
        let mut ptr: *const u8 = std::ptr::null();
        let mut len: usize = 0;
        // SAFETY: the import reads `name` and writes one pointer/length pair.
        let status = unsafe {
            ffi::texbundle_fetch_range(
                name.as_ptr(),
                name.len(),
                offset_lo,
                offset_hi,
                length,
                &mut ptr,
                &mut len,
            )
        };
        // SAFETY: the JS host keeps the buffer alive until the next call.
        let bytes = unsafe { Self::host_slice(ptr, len) };
        HostBuffer { status, bytes }
    }

    fn fetch_index(&self) -> HostBuffer<'_> {
        let mut ptr: *const u8 = std::ptr::null();
        let mut len: usize = 0;
        // SAFETY: the import writes one pointer/length pair.
        let status = unsafe { ffi::texbundle_fetch_index(&mut ptr, &mut len) };
        // SAFETY: the JS host keeps the buffer alive until the next call.
        let bytes = unsafe { Self::host_slice(ptr, len) };
        HostBuffer { status, bytes }
    }
}
