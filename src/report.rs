// src/report.rs
// =============================================================================
// Turns probe results into output lines.
//
// Text mode prints exactly one line per result:
//   [200]: https://example.com
//   [err]: https://does-not-exist.invalid
// JSON mode prints one serialized ProbeResult per line instead.
//
// Lines appear in completion order, not in document order.
// =============================================================================

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::checker::{ErrorKind, ProbeOutcome, ProbeResult};
use crate::config::OutputFormat;

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub errors: usize,
    /// Subset of `errors` caused by certificate or handshake failures.
    pub tls_errors: usize,
}

pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
    summary: ReportSummary,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            summary: ReportSummary::default(),
        }
    }

    /// Writes one line for `result` and flushes it.
    pub fn report(&mut self, result: &ProbeResult) -> io::Result<()> {
        self.summary.total += 1;
        if result.is_error() {
            self.summary.errors += 1;
        }
        if matches!(result.outcome, ProbeOutcome::Error { kind: ErrorKind::Tls, .. }) {
            self.summary.tls_errors += 1;
        }

        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", format_line(result))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, result)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn summary(&self) -> ReportSummary {
        self.summary
    }

    /// Drains `rx` until every sender is gone.
    pub async fn consume(mut self, mut rx: mpsc::UnboundedReceiver<ProbeResult>) -> io::Result<ReportSummary> {
        while let Some(result) = rx.recv().await {
            self.report(&result)?;
        }
        Ok(self.summary)
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_line(result: &ProbeResult) -> String {
    match &result.outcome {
        ProbeOutcome::Status { code } => format!("[{}]: {}", code, result.link),
        ProbeOutcome::Error { .. } => format!("[err]: {}", result.link),
    }
}
