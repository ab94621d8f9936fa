// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap (usage errors exit with 2)
// 2. Freeze them into a RunConfig (a non-.md --file fails here)
// 3. Run the walk -> probe -> report pipeline
// 4. Exit with proper code (0 = run completed, 1 = fatal error,
//    130 = aborted by a second Ctrl-C)
//
// Dead links are NOT a failure of the run: they are printed as report lines
// and leave the exit code alone. Only configuration and discovery errors
// make the process exit non-zero.
// =============================================================================

// Module declarations - tells Rust about our other source files
mod checker; // src/checker/ - extraction and probing
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - immutable run configuration
mod dispatch; // src/dispatch.rs - concurrent fan-out of probes
mod error; // src/error.rs - fatal error type
mod pipeline; // src/pipeline.rs - wiring of the whole run
mod report; // src/report.rs - output lines
mod shutdown; // src/shutdown.rs - shared "done" signal
mod walk; // src/walk/ - markdown file discovery

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use config::RunConfig;
use shutdown::Shutdown;

const LOG_ENV_VAR: &str = "MDPROBE_LOG";

// 128 + SIGINT, the shell convention for a process killed by Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.quiet, cli.verbose) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    let config = RunConfig::from_cli(cli).context("invalid configuration")?;
    tracing::debug!(?config, "starting run");

    // The first Ctrl-C stops dispatch; in-flight probes still finish and
    // report. A second one exits right away.
    let shutdown = Shutdown::new();
    let on_interrupt = shutdown.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupted, finishing in-flight probes (Ctrl-C again to abort)");
        on_interrupt.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted again, aborting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let result = pipeline::run(&config, std::io::stdout(), shutdown).await;
    interrupt.abort();

    let summary = result.context("link check aborted")?;
    tracing::info!(total = summary.total, errors = summary.errors, "all links checked");
    Ok(())
}

// Logs go to stderr so they never mix with the report on stdout
fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
