//! Terminal output for the `snapshot` command.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats. All
//! three render the same view models the web dashboard uses.

use std::io::{self, Write};

use serde::Serialize;

use crate::classify::BadgeCategory;
use crate::dashboard::LoadStatus;
use crate::stats::Stats;
use crate::view::{RowView, TableView};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude-based colors, one per severity bucket
const DARK_RED: &str = "\x1b[31m"; // Severe-high: mag >= 7.0
const RED: &str = "\x1b[91m"; // High: mag >= 6.0
const ORANGE: &str = "\x1b[38;5;208m"; // Elevated: mag >= 5.0
const YELLOW: &str = "\x1b[93m"; // Moderate: mag >= 4.0
const GREEN: &str = "\x1b[92m"; // Low: below 4.0 or unknown

const ICON_QUAKE: &str = "🌍";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON document
    Json,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Everything one snapshot shows: counters plus the table region.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub status: LoadStatus,
    pub stats: Stats,
    pub table: TableView,
}

/// ANSI color for a badge category.
fn badge_color(badge: BadgeCategory) -> &'static str {
    match badge {
        BadgeCategory::Magnitude7 => DARK_RED,
        BadgeCategory::Magnitude6 => RED,
        BadgeCategory::Magnitude5 => ORANGE,
        BadgeCategory::Magnitude4 => YELLOW,
        BadgeCategory::MagnitudeLow => GREEN,
    }
}

/// Write a snapshot in human-readable format with colors.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let stats = &snapshot.stats;
    writeln!(
        writer,
        "{ICON_QUAKE} {BOLD}{}{RESET} total │ {ORANGE}{BOLD}{}{RESET} M5+ │ {YELLOW}{BOLD}{}{RESET} M4-5",
        stats.total, stats.severe, stats.moderate,
    )?;
    writeln!(
        writer,
        "{DIM}─────────────────────────────────────────────────────────────────────{RESET}"
    )?;

    match &snapshot.table {
        TableView::Rows(rows) => {
            for row in rows {
                write_row(writer, row)?;
            }
            Ok(())
        }
        TableView::Empty => writeln!(writer, "{DIM}No earthquakes recorded{RESET}"),
        TableView::Error(message) => writeln!(writer, "{RED}{message}{RESET}"),
    }
}

fn write_row<W: Write>(writer: &mut W, row: &RowView) -> io::Result<()> {
    let color = badge_color(row.badge);
    writeln!(
        writer,
        "{color}{BOLD}M{mag:>4}{RESET} │ {DIM}{depth:>10}{RESET} │ {time} │ {place}",
        mag = row.magnitude,
        depth = row.depth,
        time = row.time,
        place = row.place,
    )
}

/// Write a snapshot as one JSON document.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write the table rows as newline-delimited JSON.
///
/// Empty and error states produce no lines.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let TableView::Rows(rows) = &snapshot.table else {
        return Ok(());
    };
    for row in rows {
        let json = serde_json::to_string(row)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write a snapshot in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_snapshot<W: Write>(writer: &mut W, snapshot: &Snapshot, format: Format) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, snapshot),
        Format::Json => write_json(writer, snapshot),
        Format::Ndjson => write_ndjson(writer, snapshot),
    }
}
