//! Blocking HTTP transport with retry
//!
//! The native host issues two kinds of request: ranged `GET`s against the
//! bundle data URL (200 or 206 accepted) and a plain `GET` for the index
//! (200 only). Both go through [`fetch_with_retry`], which owns the attempt
//! loop:
//!
//! ```text
//! Idle -> Sending -> Success
//!                 -> Retryable (sleep, attempt + 1, back to Sending)
//!                 -> Exhausted (last error returned)
//! ```
//!
//! Clients are obtained from a [`Connector`] so each prefetch worker can own
//! a private one.

use crate::bundle::IndexEntry;
use crate::config::schema::NetworkConfig;
use crate::error::{BundleError, BundleResult};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::http::Uri;
use ureq::{Agent, ResponseExt};

/// A single request
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    /// Byte window to request; `None` fetches the whole resource
    pub range: Option<IndexEntry>,
}

impl<'a> HttpRequest<'a> {
    pub fn whole(url: &'a str) -> Self {
        Self { url, range: None }
    }

    pub fn range(url: &'a str, entry: IndexEntry) -> Self {
        Self {
            url,
            range: Some(entry),
        }
    }
}

/// A completed round trip
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Final URL when the server redirected the request
    pub redirected_to: Option<String>,
}

/// Accepted response body
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub redirected_to: Option<String>,
}

/// Blocking HTTP client
pub trait HttpClient: Send {
    /// Perform one round trip; transport failures are `BundleError::Network`
    fn get(&mut self, request: &HttpRequest<'_>) -> BundleResult<HttpResponse>;
}

/// Source of independent HTTP clients
pub trait Connector: Send + Sync {
    fn connect(&self) -> Box<dyn HttpClient>;
}

/// Attempt budget and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

impl From<&NetworkConfig> for RetryPolicy {
    fn from(config: &NetworkConfig) -> Self {
        Self::new(config.attempts, config.retry_delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

/// Run `request` until it is accepted or the attempt budget runs out
///
/// Each attempt owns its response buffer; a rejected body is dropped before
/// the next attempt starts. Non-retryable errors return immediately.
pub fn fetch_with_retry(
    client: &mut dyn HttpClient,
    request: &HttpRequest<'_>,
    policy: &RetryPolicy,
) -> BundleResult<Fetched> {
    if let Some(entry) = request.range {
        // Encoding problems are not transient.
        entry.range_header()?;
    }

    let mut attempt = 1;
    loop {
        let outcome = client.get(request).and_then(|resp| accept(request, resp));

        match outcome {
            Ok(fetched) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", request.url, attempt);
                }
                return Ok(fetched);
            }
            Err(e) if e.is_retryable() && attempt < policy.attempts => {
                debug!(
                    "Attempt {}/{} for {} failed: {}",
                    attempt, policy.attempts, request.url, e
                );
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(
                        "Giving up on {} after {} attempts: {}",
                        request.url, attempt, e
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Check status and body shape of a response
fn accept(request: &HttpRequest<'_>, resp: HttpResponse) -> BundleResult<Fetched> {
    let HttpResponse {
        status,
        body,
        redirected_to,
    } = resp;

    let body = match request.range {
        None if status == 200 => body,
        None => return Err(BundleError::http(request.url, status)),
        Some(entry) => extract_range(request.url, entry, status, body)?,
    };

    Ok(Fetched {
        body,
        redirected_to,
    })
}

fn extract_range(url: &str, entry: IndexEntry, status: u16, body: Vec<u8>) -> BundleResult<Vec<u8>> {
    let want = entry.length as usize;

    match status {
        206 if body.len() == want => Ok(body),
        200 if body.len() == want => Ok(body),
        // Server ignored the Range header and sent the whole bundle.
        200 if (body.len() as u64) >= entry.offset.saturating_add(u64::from(entry.length)) => {
            let start = entry.offset as usize;
            Ok(body[start..start + want].to_vec())
        }
        200 | 206 => Err(BundleError::network(
            url,
            format!(
                "short body for bytes {}+{}: got {} bytes",
                entry.offset,
                entry.length,
                body.len()
            ),
        )),
        other => Err(BundleError::http(url, other)),
    }
}

/// `ureq`-backed connector; every client gets its own agent
#[derive(Debug, Clone)]
pub struct UreqConnector {
    timeout: Duration,
}

impl UreqConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl From<&NetworkConfig> for UreqConnector {
    fn from(config: &NetworkConfig) -> Self {
        Self::new(config.timeout())
    }
}

impl Connector for UreqConnector {
    fn connect(&self) -> Box<dyn HttpClient> {
        Box::new(UreqClient::new(self.timeout))
    }
}

/// Blocking client over a private `ureq::Agent`
pub struct UreqClient {
    agent: Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl HttpClient for UreqClient {
    fn get(&mut self, request: &HttpRequest<'_>) -> BundleResult<HttpResponse> {
        let mut builder = self.agent.get(request.url);
        if let Some(entry) = request.range {
            builder = builder.header("Range", entry.range_header()?.as_str());
        }

        let mut resp = builder
            .call()
            .map_err(|e| BundleError::network(request.url, e.to_string()))?;

        let status = resp.status().as_u16();
        let requested: Option<Uri> = request.url.parse().ok();
        let redirected_to = (requested.as_ref() != Some(resp.get_uri()))
            .then(|| resp.get_uri().to_string());

        let body = if matches!(status, 200 | 206) {
            resp.body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(|e| BundleError::network(request.url, e.to_string()))?
        } else {
            Vec::new()
        };

        Ok(HttpResponse {
            status,
            body,
            redirected_to,
        })
    }
}
