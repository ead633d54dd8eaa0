//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Parser, Subcommand};

use crate::client::FeedType;
use crate::output::Format;
use crate::scheduler::DEFAULT_REFRESH_SECS;
use crate::view::TABLE_ROW_CAP;

/// Live earthquake map and table dashboard.
#[derive(Parser, Debug)]
#[command(name = "quakeboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the dashboard web server
    Serve(ServeArgs),

    /// Fetch once and print the counters and table
    Snapshot(SnapshotArgs),
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Feed type to display
    #[arg(long, default_value = "2.5_day", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// Refresh interval in seconds (minimum 30)
    #[arg(long, default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh_interval: u64,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the `snapshot` command.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Feed type to fetch
    #[arg(long, default_value = "2.5_day", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// Maximum number of table rows to print
    #[arg(long, short = 'n', default_value_t = TABLE_ROW_CAP, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse a feed type from string.
fn parse_feed_type(s: &str) -> Result<FeedType, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
