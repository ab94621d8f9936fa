// src/error.rs
// =============================================================================
// Hard (fatal) errors for a run.
//
// Probe failures are NOT in here: a dead link is a result, not an error. They
// live in checker::http as ProbeOutcome::Error and only ever show up as report
// lines. Everything in CheckError aborts the run with a non-zero exit code.
// =============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Neither `--file` nor `--dir` was given.
    #[error("missing mandatory flags: use --file or --dir")]
    MissingTarget,

    /// `--file` pointed at something without a `.md` extension.
    #[error("not a markdown file: {}", .0.display())]
    NotMarkdown(PathBuf),

    /// A markdown file was found but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed (permission denied, vanished entry, ...).
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Report lines could not be written (closed stdout, full disk, ...).
    #[error("failed to write report: {0}")]
    Output(#[source] std::io::Error),

    /// An internal task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Pipeline(String),
}

impl From<tokio::task::JoinError> for CheckError {
    fn from(err: tokio::task::JoinError) -> Self {
        CheckError::Pipeline(err.to_string())
    }
}
