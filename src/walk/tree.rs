// src/walk/tree.rs
// =============================================================================
// File discovery: the producer end of the pipeline.
//
// How it works:
// 1. A blocking thread walks the target with walkdir (siblings sorted by name)
// 2. Every regular entry whose name ends in ".md" is read into memory
// 3. The (path, content) pair is pushed into a bounded mpsc channel
// 4. The walk ends when the tree is exhausted, on the first error, or as soon
//    as nobody is listening any more (receiver dropped or shutdown triggered)
//
// Rust concepts:
// - spawn_blocking: walkdir and std::fs are synchronous, so they get their own
//   thread instead of stalling the async workers
// - blocking_send: the sync side of a tokio channel; it parks this thread
//   while the queue is full, which throttles reading to the dispatcher's pace
// =============================================================================

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::CheckError;
use crate::shutdown::Shutdown;

const MARKDOWN_SUFFIX: &[u8] = b".md";

/// How many read-but-not-yet-dispatched files may queue up.
pub const FILE_QUEUE_CAPACITY: usize = 64;

/// What the run was pointed at. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkTarget {
    File(PathBuf),
    Dir(PathBuf),
}

impl WalkTarget {
    /// A single-file target. Anything without a `.md` extension is refused
    /// here, before any I/O happens.
    pub fn file(path: impl Into<PathBuf>) -> Result<Self, CheckError> {
        let path = path.into();
        if !is_markdown(&path) {
            return Err(CheckError::NotMarkdown(path));
        }
        Ok(WalkTarget::File(path))
    }
}

/// One markdown document, read and ready for link extraction.
#[derive(Debug, Clone)]
pub struct MarkdownFile {
    pub path: PathBuf,
    pub content: String,
}

// A plain suffix match on the file name, case-sensitive: "notes.MD" is not
// markdown, while a file named just ".md" is
fn is_markdown(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(MARKDOWN_SUFFIX))
}

/// Starts the walk on a blocking thread.
///
/// The handle resolves to the number of files sent, or to the first hard error
/// hit during traversal. Files already sent before an error stay sent.
pub fn spawn_walker(
    target: WalkTarget,
    tx: mpsc::Sender<MarkdownFile>,
    shutdown: Shutdown,
) -> JoinHandle<Result<usize, CheckError>> {
    tokio::task::spawn_blocking(move || walk(&target, &tx, &shutdown))
}

fn walk(
    target: &WalkTarget,
    tx: &mpsc::Sender<MarkdownFile>,
    shutdown: &Shutdown,
) -> Result<usize, CheckError> {
    match target {
        WalkTarget::File(path) => {
            let file = read_markdown(path)?;
            Ok(usize::from(tx.blocking_send(file).is_ok()))
        }
        WalkTarget::Dir(root) => {
            let mut sent = 0;

            for entry in WalkDir::new(root).sort_by_file_name() {
                if shutdown.is_triggered() || tx.is_closed() {
                    debug!(root = %root.display(), sent, "consumer gone, stopping walk early");
                    break;
                }

                let entry = entry?;
                if entry.file_type().is_dir() || !is_markdown(entry.path()) {
                    trace!(path = %entry.path().display(), "skipping");
                    continue;
                }

                let file = read_markdown(entry.path())?;
                if tx.blocking_send(file).is_err() {
                    debug!(root = %root.display(), sent, "receiver dropped, stopping walk");
                    break;
                }
                sent += 1;
            }

            Ok(sent)
        }
    }
}

// Non-UTF-8 bytes are replaced rather than treated as a read failure
fn read_markdown(path: &Path) -> Result<MarkdownFile, CheckError> {
    let bytes = std::fs::read(path).map_err(|source| CheckError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read markdown file");

    Ok(MarkdownFile {
        path: path.to_path_buf(),
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
