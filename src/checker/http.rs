// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Builds ONE pooled reqwest client per run and reuses it for every probe
// - Sends exactly one request per link, with the configured method,
//   User-Agent and an `Accept: */*` header
// - Captures the status code and drops the response right away so the
//   connection goes back to (or out of) the pool promptly
// - Turns transport failures (DNS, refused, TLS, timeout, bad URL) into an
//   error outcome instead of an Err: a dead link never aborts the run
//
// Resource limits (the real backpressure under unbounded fan-out):
// - at most MAX_IDLE_PER_HOST idle connections are kept per host
// - idle connections are evicted after IDLE_TIMEOUT
// - at most MAX_CONNS_PER_HOST probes talk to the same host at once
// =============================================================================

use std::collections::HashMap;
use std::error::Error as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};
use url::Url;

use super::dns::DnsCache;
use crate::config::ProbeConfig;
use crate::error::CheckError;

pub const MAX_IDLE_PER_HOST: usize = 10;
pub const MAX_CONNS_PER_HOST: usize = 10;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// Why a probe produced no status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request timed out
    Timeout,
    /// Could not resolve hostname
    Dns,
    /// Connection refused or reset
    Connect,
    /// SSL/TLS certificate or handshake error
    Tls,
    /// Redirect loop or too many redirects
    Redirect,
    /// The link is not a valid URL
    InvalidUrl,
    /// Anything else
    Other,
}

/// What happened to a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Status { code: u16 },
    Error { kind: ErrorKind, message: String },
}

/// Exactly one of these exists per discovered link occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub link: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    fn status(link: String, code: u16) -> Self {
        Self {
            link,
            outcome: ProbeOutcome::Status { code },
        }
    }

    fn error(link: String, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            link,
            outcome: ProbeOutcome::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Error { .. })
    }
}

// Caps how many probes may talk to one host at the same time.
//
// reqwest pools idle connections but does not cap active ones per host, so
// every host gets its own semaphore, created on first use and dropped again
// once no probe holds or waits for it.
#[derive(Debug, Default)]
struct HostLimiter {
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<Semaphore>>> {
        self.per_host.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn acquire(&self, url: &Url) -> HostPermit<'_> {
        let key = format!(
            "{}:{}",
            url.host_str().unwrap_or_default(),
            url.port_or_known_default().unwrap_or_default()
        );
        let semaphore = self
            .table()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(MAX_CONNS_PER_HOST)))
            .clone();

        HostPermit {
            limiter: self,
            key,
            // the semaphores are never closed, so this only fails in theory
            permit: semaphore.acquire_owned().await.ok(),
        }
    }

    // Every clone of a semaphore is made under the lock, and both waiters and
    // permits hold one, so a count of 1 means only the map still refers to it.
    fn release(&self, key: &str) {
        let mut table = self.table();
        if table.get(key).is_some_and(|s| Arc::strong_count(s) == 1) {
            table.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

struct HostPermit<'a> {
    limiter: &'a HostLimiter,
    key: String,
    permit: Option<OwnedSemaphorePermit>,
}

impl Drop for HostPermit<'_> {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.limiter.release(&self.key);
    }
}

/// The shared HTTP transport. Build once, wrap in an `Arc`, probe many times.
#[derive(Debug)]
pub struct ProbeClient {
    client: Client,
    config: ProbeConfig,
    hosts: HostLimiter,
}

impl ProbeClient {
    /// Builds the pooled client. Pass a `DnsCache` to route every lookup
    /// through it; `None` uses the system resolver directly.
    pub fn new(config: ProbeConfig, dns: Option<DnsCache>) -> Result<Self, CheckError> {
        let redirect = if config.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout)
            .redirect(redirect)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .danger_accept_invalid_certs(config.skip_tls);

        if let Some(cache) = dns {
            builder = builder.dns_resolver(Arc::new(cache));
        }

        Ok(Self {
            client: builder.build()?,
            config,
            hosts: HostLimiter::default(),
        })
    }

    /// Issues exactly one request for `link`. Never fails: transport
    /// problems come back as `ProbeOutcome::Error`.
    pub async fn probe(&self, link: String) -> ProbeResult {
        let url = match Url::parse(&link) {
            Ok(url) => url,
            Err(e) => return ProbeResult::error(link, ErrorKind::InvalidUrl, e.to_string()),
        };

        let _permit = self.hosts.acquire(&url).await;
        trace!(%link, method = %self.config.method, "sending probe");

        let result = self
            .client
            .request(self.config.method.as_reqwest(), url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "*/*")
            .send()
            .await;

        match result {
            Ok(response) => {
                let code = response.status().as_u16();
                // body is never read; dropping releases the connection
                drop(response);
                debug!(%link, code, "probe finished");
                ProbeResult::status(link, code)
            }
            Err(e) => {
                let result = categorize_error(link, &e);
                debug!(link = %result.link, error = %e, "probe failed");
                result
            }
        }
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
// The useful detail sits deep in the source chain. Only the causes are
// matched on: the top-level message embeds the URL, and a host such as
// www.openssl.org must not look like a TLS failure.
fn categorize_error(link: String, error: &reqwest::Error) -> ProbeResult {
    let message = error_chain(error);
    let lower = error
        .source()
        .map(error_chain)
        .unwrap_or_default()
        .to_lowercase();

    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_redirect() {
        ErrorKind::Redirect
    } else if error.is_builder() {
        ErrorKind::InvalidUrl
    } else if lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl") {
        ErrorKind::Tls
    } else if lower.contains("dns")
        || lower.contains("lookup")
        || lower.contains("no addresses found")
        || lower.contains("name or service not known")
    {
        ErrorKind::Dns
    } else if error.is_connect() {
        ErrorKind::Connect
    } else {
        ErrorKind::Other
    };

    ProbeResult::error(link, kind, message)
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
