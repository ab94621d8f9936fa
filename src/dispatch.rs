// src/dispatch.rs
// =============================================================================
// Fan-out / fan-in of probes.
//
// The dispatcher pulls markdown files off the walker's queue as they arrive,
// extracts their links and spawns one tokio task per link occurrence. Each
// task pushes its ProbeResult into an unbounded channel read by the reporter.
//
// By default nothing caps the number of tasks in flight; the per-host
// connection limits in the probe client are what actually throttles the
// network. An optional semaphore can bound the fan-out without changing the
// shape of the pipeline: the dispatcher just waits for a permit before
// spawning the next probe.
//
// Once the shutdown signal fires no new probe is spawned, even for files that
// are already queued; probes already running still finish and report.
// =============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::checker::{extract_markdown_links, ProbeClient, ProbeResult};
use crate::shutdown::Shutdown;
use crate::walk::MarkdownFile;

/// The largest bound a semaphore can hold; larger requests are clamped.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

pub struct Dispatcher {
    client: Arc<ProbeClient>,
    limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// `concurrency: None` means unbounded fan-out.
    pub fn new(client: Arc<ProbeClient>, concurrency: Option<usize>) -> Self {
        Self {
            client,
            limit: concurrency.map(|n| Arc::new(Semaphore::new(n.clamp(1, MAX_CONCURRENCY)))),
        }
    }

    /// Dispatches every link of every file received on `files`, then waits
    /// for all probes to finish. Returns how many probes were spawned.
    ///
    /// Returns once `files` is closed and drained (or `shutdown` fired) and
    /// every probe has sent its result, so dropping `results` afterwards ends
    /// the reporter.
    pub async fn run(
        &self,
        mut files: mpsc::Receiver<MarkdownFile>,
        results: mpsc::UnboundedSender<ProbeResult>,
        shutdown: &Shutdown,
    ) -> usize {
        let mut probes = JoinSet::new();
        let mut dispatched = 0;

        'files: while let Some(file) = files.recv().await {
            let links = extract_markdown_links(&file.content);
            debug!(path = %file.path.display(), links = links.len(), "dispatching links");

            for link in links {
                if shutdown.is_triggered() {
                    debug!(dispatched, "shutdown requested, no further probes");
                    break 'files;
                }

                let permit = match &self.limit {
                    Some(limit) => limit.clone().acquire_owned().await.ok(),
                    None => None,
                };
                let client = self.client.clone();
                let results = results.clone();

                probes.spawn(async move {
                    let result = client.probe(link).await;
                    drop(permit);
                    // a closed channel means the reporter already gave up
                    let _ = results.send(result);
                });
                dispatched += 1;
            }
        }

        // closing the queue stops the walker at its next send
        drop(files);

        // barrier: every spawned probe must have reported before we return
        while let Some(joined) = probes.join_next().await {
            if let Err(error) = joined {
                warn!(%error, "probe task failed");
            }
        }

        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::test_support::{Reply, TestServer};
    use std::path::PathBuf;

    fn markdown(content: String) -> MarkdownFile {
        MarkdownFile {
            path: PathBuf::from("test.md"),
            content,
        }
    }

    async fn dispatch(files: Vec<MarkdownFile>, concurrency: Option<usize>) -> (usize, Vec<ProbeResult>) {
        dispatch_until(files, concurrency, Shutdown::new()).await
    }

    async fn dispatch_until(
        files: Vec<MarkdownFile>,
        concurrency: Option<usize>,
        shutdown: Shutdown,
    ) -> (usize, Vec<ProbeResult>) {
        let client = Arc::new(ProbeClient::new(ProbeConfig::default(), None).unwrap());
        let (file_tx, file_rx) = mpsc::channel(8);
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        let feeder = tokio::spawn(async move {
            for file in files {
                if file_tx.send(file).await.is_err() {
                    break;
                }
            }
        });

        let dispatched = Dispatcher::new(client, concurrency)
            .run(file_rx, result_tx, &shutdown)
            .await;
        feeder.await.unwrap();

        let mut results = Vec::new();
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        (dispatched, results)
    }

    #[tokio::test]
    async fn every_occurrence_gets_one_result() {
        let server = TestServer::start(&[("/1", Reply::Status(200)), ("/2", Reply::Status(404))]).await;
        let files = vec![
            markdown(format!("[x]({}) [y]({})", server.url("/1"), server.url("/1"))),
            markdown(format!("[z]({})", server.url("/2"))),
            markdown("no links here".to_string()),
        ];

        let (dispatched, results) = dispatch(files, None).await;
        assert_eq!(dispatched, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.link == server.url("/1")).count(), 2);
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn bounded_concurrency_still_probes_everything() {
        let server = TestServer::start(&[("/ok", Reply::Status(200))]).await;
        let content = (0..6)
            .map(|i| format!("[{i}]({})", server.url("/ok")))
            .collect::<Vec<_>>()
            .join("\n");

        let (dispatched, results) = dispatch(vec![markdown(content)], Some(1)).await;
        assert_eq!(dispatched, 6);
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| !r.is_error()));
    }

    #[tokio::test]
    async fn soft_errors_do_not_stop_other_probes() {
        let server = TestServer::start(&[("/ok", Reply::Status(200))]).await;
        let content = format!(
            "[bad](http://exa mple.com/) [good]({})",
            server.url("/ok")
        );

        let (_, results) = dispatch(vec![markdown(content)], None).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);
    }

    #[tokio::test]
    async fn nothing_is_dispatched_after_shutdown() {
        let server = TestServer::start(&[("/ok", Reply::Status(200))]).await;
        let files = (0..4)
            .map(|_| markdown(format!("[a]({})", server.url("/ok"))))
            .collect();

        let shutdown = Shutdown::new();
        shutdown.trigger();
        let (dispatched, results) = dispatch_until(files, None, shutdown).await;

        assert_eq!(dispatched, 0);
        assert!(results.is_empty());
        assert!(server.requests().is_empty());
    }

    #[test]
    fn oversized_bound_is_clamped() {
        let client = Arc::new(ProbeClient::new(ProbeConfig::default(), None).unwrap());
        let dispatcher = Dispatcher::new(client, Some(usize::MAX));
        let limit = dispatcher.limit.as_ref().unwrap();
        assert_eq!(limit.available_permits(), MAX_CONCURRENCY);
    }
}
