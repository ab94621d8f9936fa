// src/pipeline.rs
// =============================================================================
// Wires the whole run together:
//
//   walker ──files──▶ dispatcher ──(one task per link)──▶ results ──▶ reporter
//
// - the walker streams files through a bounded queue, so probes start while
//   the tree is still being enumerated
// - the dispatcher joins every probe before it returns
// - the reporter owns stdout and drains results until the last sender drops
//
// A hard discovery error does not cancel anything in flight: the walker just
// stops producing, the dispatcher finishes what it already has, the reporter
// prints those results, and only THEN is the error handed back to main.
// =============================================================================

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::checker::{DnsCache, ProbeClient, REFRESH_INTERVAL};
use crate::config::RunConfig;
use crate::dispatch::Dispatcher;
use crate::error::CheckError;
use crate::report::{ReportSummary, Reporter};
use crate::shutdown::Shutdown;
use crate::walk::{spawn_walker, FILE_QUEUE_CAPACITY};

/// Runs one check over `config.target`, writing report lines to `out`.
///
/// `shutdown` stops discovery and dispatch early (e.g. on Ctrl-C); files
/// still queued are skipped, probes already dispatched complete and report.
pub async fn run<W>(config: &RunConfig, out: W, shutdown: Shutdown) -> Result<ReportSummary, CheckError>
where
    W: Write + Send + 'static,
{
    let dns = config.dns_cache.then(DnsCache::new);
    let client = Arc::new(ProbeClient::new(config.probe.clone(), dns.clone())?);
    let refresher = dns.as_ref().map(|cache| cache.start_refresh(REFRESH_INTERVAL));

    let (file_tx, file_rx) = mpsc::channel(FILE_QUEUE_CAPACITY);
    let (result_tx, result_rx) = mpsc::unbounded_channel();

    let walker = spawn_walker(config.target.clone(), file_tx, shutdown.clone());
    let reporter = tokio::spawn(Reporter::new(out, config.format).consume(result_rx));

    let dispatched = Dispatcher::new(client, config.concurrency)
        .run(file_rx, result_tx, &shutdown)
        .await;

    // the dispatcher has stopped listening; make sure discovery notices too
    shutdown.trigger();

    let reported = reporter.await;
    let walked = walker.await;
    if let Some(refresher) = refresher {
        refresher.stop().await;
    }

    let summary = reported?.map_err(CheckError::Output)?;
    info!(
        dispatched,
        reported = summary.total,
        errors = summary.errors,
        "run finished"
    );
    if summary.tls_errors > 0 && !config.probe.skip_tls {
        warn!(
            count = summary.tls_errors,
            "some links failed certificate verification; --skip-tls ignores invalid certificates"
        );
    }

    match walked? {
        Ok(files) => {
            info!(files, "discovery finished");
            Ok(summary)
        }
        Err(err) => {
            error!(error = %err, "discovery failed");
            Err(err)
        }
    }
}
