//! quakeboard - Live earthquake map and table dashboard.
//!
//! Fetches the USGS summary feed on a fixed interval, keeps the latest
//! snapshot in memory and paints it as a map, a table and a details panel.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

mod classify;
mod cli;
mod client;
mod dashboard;
mod errors;
mod models;
mod output;
mod scheduler;
mod server;
mod stats;
mod store;
mod view;

use cli::{Cli, Command};
use client::UsgsClient;
use dashboard::{Dashboard, LoadStatus, notice_channel};
use scheduler::RefreshScheduler;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `snapshot` command - one refresh cycle, printed.
fn cmd_snapshot(args: cli::SnapshotArgs) -> Result<()> {
    let client = UsgsClient::new(args.feed).context("failed to create USGS client")?;

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let snapshot = runtime.block_on(async {
        let dashboard = Dashboard::shared(args.limit);
        let scheduler = RefreshScheduler::new(
            client,
            Arc::clone(&dashboard),
            notice_channel(),
            Duration::from_secs(scheduler::DEFAULT_REFRESH_SECS),
        );
        if let scheduler::RefreshOutcome::Applied { records } = scheduler.refresh_once().await {
            debug!(records, "snapshot fetched");
        }

        let dashboard = dashboard.read().await;
        output::Snapshot {
            status: dashboard.status().clone(),
            stats: dashboard.stats(),
            table: dashboard.table(),
        }
    });

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_snapshot(&mut handle, &snapshot, args.format)?;

    if matches!(snapshot.status, LoadStatus::Failed(_)) {
        anyhow::bail!("failed to fetch earthquake feed {}", args.feed.as_str());
    }
    Ok(())
}

/// Execute the `serve` command - start web server.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let (refresh_secs, clamped) = scheduler::clamp_refresh_secs(args.refresh_interval);
    if clamped {
        tracing::warn!("refresh interval clamped to minimum of {refresh_secs} seconds");
    }

    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        feed_type: args.feed,
        refresh_interval: Duration::from_secs(refresh_secs),
        ..Default::default()
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakeboard\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Feed:    {}", args.feed.as_str());
    println!("  Refresh: {refresh_secs}s");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config))
}
