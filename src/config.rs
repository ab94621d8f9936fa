// src/config.rs
// =============================================================================
// The immutable configuration snapshot for one run.
//
// Built exactly once from the parsed CLI and then handed (by reference or
// inside an Arc) to the walker, the probe client and the reporter. Nothing in
// here changes after startup.
// =============================================================================

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;
use crate::dispatch::MAX_CONCURRENCY;
use crate::error::CheckError;
use crate::walk::WalkTarget;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:102.0) Gecko/20100101 Firefox/102.0";

/// The two verbs a probe may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(format!("http method must be HEAD or GET, got {other:?}")),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
        })
    }
}

/// How the reporter renders each result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Everything the probe client needs to issue one request.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub method: HttpMethod,
    pub skip_tls: bool,
    pub follow_redirects: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            method: HttpMethod::Get,
            skip_tls: false,
            follow_redirects: true,
        }
    }
}

/// The whole run: what to walk, how to probe, how to report.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: WalkTarget,
    pub probe: ProbeConfig,
    /// `None` keeps fan-out unbounded; the connection pool limits still apply.
    pub concurrency: Option<usize>,
    pub dns_cache: bool,
    pub format: OutputFormat,
}

impl RunConfig {
    /// Resolves the walk target and freezes the flags.
    ///
    /// Fails with `CheckError::NotMarkdown` for a `--file` that is not `.md`,
    /// before anything is read or sent.
    pub fn from_cli(cli: Cli) -> Result<Self, CheckError> {
        let target = match (cli.file, cli.dir) {
            (Some(file), _) => WalkTarget::file(file)?,
            (None, Some(dir)) => WalkTarget::Dir(dir),
            // clap's required ArgGroup makes this unreachable from main()
            (None, None) => return Err(CheckError::MissingTarget),
        };

        Ok(Self {
            target,
            probe: ProbeConfig {
                timeout: Duration::from_secs(cli.timeout),
                user_agent: cli.user_agent,
                method: cli.http_method,
                skip_tls: cli.skip_tls,
                follow_redirects: cli.follow_redirects,
            },
            concurrency: cli
                .concurrency
                .map(|n| usize::try_from(n).unwrap_or(MAX_CONCURRENCY).min(MAX_CONCURRENCY)),
            dns_cache: !cli.no_dns_cache,
            format: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
        })
    }
}
