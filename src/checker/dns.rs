// src/checker/dns.rs
// =============================================================================
// An in-memory DNS cache plugged into reqwest as its resolver.
//
// Many links in a documentation tree share a handful of hosts (github.com,
// docs.rs, ...). Without a cache every new connection to those hosts goes
// back to the system resolver. With it, the first lookup per host hits the
// resolver and the rest are answered from memory.
//
// Freshness is handled by an optional background task:
// - every REFRESH_INTERVAL it re-resolves each cached host
// - hosts nobody asked for since the previous refresh are evicted
// - if a re-resolve fails, the previous addresses are kept
//
// The task is owned through a RefreshHandle and must be stopped explicitly.
// =============================================================================

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::shutdown::Shutdown;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
struct CacheEntry {
    addrs: Vec<SocketAddr>,
    // set on every lookup, cleared by every refresh
    used: bool,
}

/// Cheap to clone; every clone shares the same table.
#[derive(Debug, Clone, Default)]
pub struct DnsCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another task panicked mid-update; the map
    // itself is still usable.
    fn table(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Addresses for `host`, from the cache when possible.
    pub async fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>> {
        let cached = self.table().get_mut(host).map(|entry| {
            entry.used = true;
            entry.addrs.clone()
        });
        if let Some(addrs) = cached {
            return Ok(addrs);
        }

        let addrs = resolve_host(host).await?;
        debug!(host, count = addrs.len(), "dns cache miss");
        self.table().insert(
            host.to_string(),
            CacheEntry {
                addrs: addrs.clone(),
                used: true,
            },
        );
        Ok(addrs)
    }

    /// One refresh pass: evict unused hosts, re-resolve the rest.
    pub async fn refresh(&self) {
        let hosts: Vec<String> = {
            let mut table = self.table();
            table.retain(|_, entry| entry.used);
            table
                .iter_mut()
                .map(|(host, entry)| {
                    entry.used = false;
                    host.clone()
                })
                .collect()
        };

        for host in hosts {
            match resolve_host(&host).await {
                Ok(addrs) => self.replace(&host, addrs),
                Err(error) => {
                    warn!(%host, %error, "dns refresh failed, keeping previous addresses");
                }
            }
        }
    }

    // only touches hosts that survived eviction
    fn replace(&self, host: &str, addrs: Vec<SocketAddr>) {
        if let Some(entry) = self.table().get_mut(host) {
            entry.addrs = addrs;
        }
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns the periodic refresher. Stop it with [`RefreshHandle::stop`].
    pub fn start_refresh(&self, every: Duration) -> RefreshHandle {
        let cache = self.clone();
        let shutdown = Shutdown::new();
        let signal = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately; nothing to refresh yet
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = signal.wait() => break,
                    _ = ticker.tick() => {
                        cache.refresh().await;
                        debug!(hosts = cache.len(), "dns cache refreshed");
                    }
                }
            }
            debug!("dns refresher stopped");
        });

        RefreshHandle { shutdown, task }
    }

    #[cfg(test)]
    fn insert(&self, host: &str, addrs: Vec<SocketAddr>) {
        self.table()
            .insert(host.to_string(), CacheEntry { addrs, used: true });
    }
}

impl Resolve for DnsCache {
    fn resolve(&self, name: Name) -> Resolving {
        let cache = self.clone();
        Box::pin(async move {
            let addrs = cache.lookup(name.as_str()).await?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, BoxError>(addrs)
        })
    }
}

/// Owns the background refresh task.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signals the task and waits for it to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(error) = self.task.await {
            warn!(%error, "dns refresher did not shut down cleanly");
        }
    }
}

// Port 0: the connector fills in the port from the URL
async fn resolve_host(host: &str) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}"),
        ));
    }
    Ok(addrs)
}
