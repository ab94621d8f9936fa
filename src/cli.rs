// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the Cli struct below IS the flag table. clap
// rejects bad input (no target, both targets, unknown --http-method) before
// main() does anything else, so config errors never reach the network.
// =============================================================================

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::{HttpMethod, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::dispatch::MAX_CONCURRENCY;

// This struct represents our entire CLI application
//
// The "target" group makes --file and --dir mutually exclusive and requires
// exactly one of them.
#[derive(Parser, Debug)]
#[command(
    name = "mdprobe",
    version,
    about = "Check every HTTP(S) link in a markdown file or a tree of markdown files",
    long_about = "mdprobe extracts inline [text](http...) links from markdown and probes \
                  each one concurrently, printing one `[<status>]: <link>` or \
                  `[err]: <link>` line per occurrence."
)]
#[command(group(ArgGroup::new("target").required(true).args(["file", "dir"])))]
pub struct Cli {
    /// Path of a single markdown file to check
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Path of a directory; every .md file under it is checked
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Ignore invalid TLS/SSL certificates
    #[arg(long)]
    pub skip_tls: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Value of the User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// HTTP verb: HEAD (faster, less accurate) or GET (slower, trustworthy)
    #[arg(long, default_value = "GET")]
    pub http_method: HttpMethod,

    /// Follow 3xx responses; with `false` the redirect status itself is reported
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub follow_redirects: bool,

    /// Maximum number of probes in flight (unbounded when omitted)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_CONCURRENCY as u64))]
    pub concurrency: Option<u64>,

    /// Resolve every connection through the system resolver instead of the cache
    #[arg(long)]
    pub no_dns_cache: bool,

    /// Print one JSON object per result instead of the text line
    #[arg(long)]
    pub json: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}
