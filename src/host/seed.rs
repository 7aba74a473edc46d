//! Concurrent batch prefetch
//!
//! A bounded pool of scoped OS threads pulls item indices from one shared
//! counter. Each index is claimed exactly once by `fetch_add`; items are
//! independent, so relaxed ordering is enough. Every worker connects its own
//! HTTP client. Hashing and network I/O run outside the cache lock; only the
//! manifest insert is serialized.

use crate::config::schema::MAX_WORKERS;
use crate::host::native::NativeHost;
use crate::host::{SeedItem, SeedResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, info, warn};

/// Number of workers for a batch: `min(requested, items, cap)`, at least 1
pub fn worker_count(requested: usize, items: usize, cap: usize) -> usize {
    requested.min(items).min(cap).min(MAX_WORKERS).max(1)
}

/// Prefetch `items` into the host's cache and join every worker
///
/// The caller persists the manifest afterwards.
pub(crate) fn run(host: &NativeHost, items: &[SeedItem], concurrency: usize) -> SeedResult {
    let workers = worker_count(concurrency, items.len(), host.worker_cap());
    info!("Prefetching {} resources with {} workers", items.len(), workers);

    let next = AtomicUsize::new(0);
    let fetched = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let work = || {
        let mut client = host.connector().connect();
        loop {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(i) else {
                break;
            };

            match host.seed_one(client.as_mut(), item) {
                Ok(()) => {
                    fetched.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("Prefetch of {} failed: {}", item.name, e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    };

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("texbundle-seed-{}", id))
                .spawn_scoped(scope, &work);
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("Could not spawn prefetch worker {}: {}", id, e),
            }
        }

        if handles.is_empty() {
            debug!("No prefetch workers available, fetching on the calling thread");
            work();
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("Prefetch worker panicked");
            }
        }
    });

    let fetched = fetched.into_inner();
    let failed = failed.into_inner();
    // Items claimed by a panicked worker were never counted.
    let failed = failed + (items.len() - fetched - failed);

    debug!("Prefetch done: {} fetched, {} failed", fetched, failed);
    SeedResult { fetched, failed }
}
