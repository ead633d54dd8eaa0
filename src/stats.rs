//! Summary counters derived from the record store.
//!
//! Counts are recomputed on every call; nothing is cached between refreshes.

use serde::Serialize;

use crate::classify::usable;
use crate::store::RecordStore;

/// Lower bound (inclusive) of the "severe" counter.
pub const SEVERE_THRESHOLD: f64 = 5.0;

/// Lower bound (inclusive) of the "moderate" counter; its upper bound is
/// [`SEVERE_THRESHOLD`] (exclusive).
pub const MODERATE_THRESHOLD: f64 = 4.0;

/// Point-in-time counters for the dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub severe: usize,
    pub moderate: usize,
}

impl RecordStore {
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.len()
    }

    /// Records with magnitude >= 5.
    #[must_use]
    pub fn severe_count(&self) -> usize {
        self.all()
            .iter()
            .filter(|r| usable(r.magnitude).is_some_and(|m| m >= SEVERE_THRESHOLD))
            .count()
    }

    /// Records with 4 <= magnitude < 5.
    #[must_use]
    pub fn moderate_count(&self) -> usize {
        self.all()
            .iter()
            .filter(|r| {
                usable(r.magnitude)
                    .is_some_and(|m| (MODERATE_THRESHOLD..SEVERE_THRESHOLD).contains(&m))
            })
            .count()
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats {
            total: self.total_count(),
            severe: self.severe_count(),
            moderate: self.moderate_count(),
        }
    }
}
