//! In-process fakes for host tests

use crate::bundle::IndexEntry;
use crate::config::Config;
use crate::digest::Digest;
use crate::error::{BundleError, BundleResult};
use crate::host::http::{Connector, HttpClient, HttpRequest, HttpResponse};
use crate::host::wasm::{
    join_offset, HostBuffer, JsBridge, STATUS_FILE_NOT_FOUND, STATUS_INDEX_NOT_LOADED,
    STATUS_NETWORK,
};
use crate::host::SeedItem;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DATA_URL: &str = "http://bundle.test/bundle.tar";
pub const INDEX_URL: &str = "http://bundle.test/bundle.tar.index.gz";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.bundle.url = DATA_URL.to_string();
    config.bundle.index_url = INDEX_URL.to_string();
    config.bundle.digest = Some(Digest::of(b"test bundle"));
    config.network.attempts = 3;
    config.network.retry_delay_ms = 0;
    config
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Packed data, index text and matching seed items for `n` resources
pub fn sample_bundle(n: usize) -> (Vec<u8>, String, Vec<SeedItem>) {
    let mut data = Vec::new();
    let mut index = String::new();
    let mut items = Vec::new();

    for i in 0..n {
        let name = format!("file{:03}.tex", i);
        let content = format!("% {}\n", name).repeat(i % 7 + 1);
        let entry = IndexEntry::new(data.len() as u64, content.len() as u32);

        data.extend_from_slice(content.as_bytes());
        index.push_str(&format!("{} {} {}\n", name, entry.offset, entry.length));
        items.push(SeedItem::new(name, entry));
    }

    (data, index, items)
}

/// Serves ranges of `data` and a gzip index, with scripted failures
#[derive(Default)]
pub struct FakeServer {
    data: Vec<u8>,
    index_gz: Mutex<Vec<u8>>,
    redirect: Mutex<Option<String>>,
    fail_budget: AtomicUsize,
    pub connects: AtomicUsize,
    pub range_requests: AtomicUsize,
    pub index_requests: AtomicUsize,
    pub redirects: AtomicUsize,
}

impl FakeServer {
    pub fn new(data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data,
            ..Default::default()
        })
    }

    pub fn connector(self: &Arc<Self>) -> FakeConnector {
        FakeConnector(Arc::clone(self))
    }

    /// Fail the next `n` requests with a transport error
    pub fn fail_next(&self, n: usize) {
        self.fail_budget.store(n, Ordering::SeqCst);
    }

    pub fn set_index(&self, gz: Vec<u8>) {
        *self.index_gz.lock().unwrap() = gz;
    }

    /// Answer data requests on the configured URL as if redirected to `target`
    pub fn redirect_to(&self, target: &str) {
        *self.redirect.lock().unwrap() = Some(target.to_string());
    }

    fn take_failure(&self) -> bool {
        self.fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn serve(&self, request: &HttpRequest<'_>) -> BundleResult<HttpResponse> {
        let Some(entry) = request.range else {
            self.index_requests.fetch_add(1, Ordering::SeqCst);
            if self.take_failure() {
                return Err(BundleError::network(request.url, "connection reset"));
            }
            return Ok(HttpResponse {
                status: 200,
                body: self.index_gz.lock().unwrap().clone(),
                redirected_to: None,
            });
        };

        self.range_requests.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(BundleError::network(request.url, "connection reset"));
        }

        let redirected_to = self
            .redirect
            .lock()
            .unwrap()
            .clone()
            .filter(|target| target != request.url);
        if redirected_to.is_some() {
            self.redirects.fetch_add(1, Ordering::SeqCst);
        }

        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        if entry.offset > self.data.len() as u64 || end > self.data.len() {
            return Ok(HttpResponse {
                status: 416,
                body: Vec::new(),
                redirected_to,
            });
        }

        Ok(HttpResponse {
            status: 206,
            body: self.data[start..end].to_vec(),
            redirected_to,
        })
    }
}

pub struct FakeConnector(Arc<FakeServer>);

impl Connector for FakeConnector {
    fn connect(&self) -> Box<dyn HttpClient> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeClient(Arc::clone(&self.0)))
    }
}

struct FakeClient(Arc<FakeServer>);

impl HttpClient for FakeClient {
    fn get(&mut self, request: &HttpRequest<'_>) -> BundleResult<HttpResponse> {
        self.0.serve(request)
    }
}

/// In-memory stand-in for the JS side of the WASM boundary
#[derive(Default)]
pub struct MemoryBridge {
    pub data: Vec<u8>,
    pub index: Option<Vec<u8>>,
    pub calls: RefCell<Vec<String>>,
    pub failures: Cell<usize>,
}

impl MemoryBridge {
    pub fn new(data: Vec<u8>, index: &str) -> Self {
        Self {
            data,
            index: Some(index.as_bytes().to_vec()),
            ..Default::default()
        }
    }

    fn take_failure(&self) -> bool {
        let left = self.failures.get();
        if left == 0 {
            return false;
        }
        self.failures.set(left - 1);
        true
    }
}

impl JsBridge for MemoryBridge {
    fn fetch_range(
        &self,
        name: &str,
        offset_lo: u32,
        offset_hi: u32,
        length: u32,
    ) -> HostBuffer<'_> {
        self.calls.borrow_mut().push(name.to_string());
        if self.take_failure() {
            return HostBuffer::status(STATUS_NETWORK);
        }
        if self.index.is_none() {
            return HostBuffer::status(STATUS_INDEX_NOT_LOADED);
        }

        let start = join_offset(offset_lo, offset_hi) as usize;
        let end = start + length as usize;
        match self.data.get(start..end) {
            Some(bytes) => HostBuffer::ok(bytes),
            None => HostBuffer::status(STATUS_FILE_NOT_FOUND),
        }
    }

    fn fetch_index(&self) -> HostBuffer<'_> {
        self.calls.borrow_mut().push("<index>".to_string());
        match &self.index {
            Some(index) => HostBuffer::ok(index),
            None => HostBuffer::status(STATUS_INDEX_NOT_LOADED),
        }
    }
}
