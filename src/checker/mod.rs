// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - markdown: Extracts inline links from markdown text (pure, no I/O)
// - http: The pooled probe client and the ProbeResult model
// - dns: An optional caching resolver for the probe client
// =============================================================================

mod dns;
mod http;
mod markdown;

pub use dns::{DnsCache, REFRESH_INTERVAL};
pub use http::{ErrorKind, ProbeClient, ProbeOutcome, ProbeResult};
pub use markdown::extract_markdown_links;
