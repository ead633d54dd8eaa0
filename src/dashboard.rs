//! Application state shared by the refresh scheduler and the web surface.
//!
//! `Dashboard` owns the record store and the view renderer. All mutation goes
//! through its methods, and callers hold it behind a single lock so a repaint
//! is always observed whole.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::errors::FeedError;
use crate::models::Record;
use crate::stats::Stats;
use crate::store::RecordStore;
use crate::view::{DetailView, MapWidget, MarkerLayer, TableView, ViewRenderer};

/// Table message when the very first fetch fails.
pub const FIRST_LOAD_ERROR: &str = "Failed to load earthquake data. Please try again.";

/// Dashboard guarded for concurrent access from tasks and handlers.
pub type SharedDashboard<M = MarkerLayer> = Arc<RwLock<Dashboard<M>>>;

/// Where the dashboard is in its data lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadStatus {
    /// No fetch has completed yet
    Pending,
    /// At least one snapshot was applied
    Loaded,
    /// Every fetch so far failed; nothing to show
    Failed(String),
}

/// Change notifications pushed to connected pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Store replaced (or first load failed); regions and markers are stale
    Refreshed,
    /// A record was selected
    Highlighted(String),
}

/// The store, its views and the load status, kept consistent together.
#[derive(Debug)]
pub struct Dashboard<M = MarkerLayer> {
    store: RecordStore,
    view: ViewRenderer<M>,
    status: LoadStatus,
    applied_generation: u64,
}

impl Dashboard<MarkerLayer> {
    #[must_use]
    pub fn new(row_cap: usize) -> Self {
        Self::with_map(MarkerLayer::new(), row_cap)
    }

    /// Wrap a fresh dashboard for sharing.
    #[must_use]
    pub fn shared(row_cap: usize) -> SharedDashboard {
        Arc::new(RwLock::new(Self::new(row_cap)))
    }
}

impl<M: MapWidget> Dashboard<M> {
    #[must_use]
    pub fn with_map(map: M, row_cap: usize) -> Self {
        Self {
            store: RecordStore::new(),
            view: ViewRenderer::with_row_cap(map, row_cap),
            status: LoadStatus::Pending,
            applied_generation: 0,
        }
    }

    /// Apply a successful fetch issued as `generation`.
    ///
    /// Results older than the last applied generation are dropped and
    /// `false` is returned.
    pub fn apply_snapshot(&mut self, generation: u64, records: Vec<Record>) -> bool {
        if generation <= self.applied_generation {
            debug!(
                generation,
                applied = self.applied_generation,
                "discarding stale snapshot"
            );
            return false;
        }

        self.applied_generation = generation;
        self.store.replace_all(records);
        self.status = LoadStatus::Loaded;
        self.view.repaint(&self.store);

        let stats = self.store.stats();
        info!(
            total = stats.total,
            severe = stats.severe,
            moderate = stats.moderate,
            markers = self.view.marker_count(),
            "applied snapshot #{generation}"
        );
        true
    }

    /// Record a failed fetch.
    ///
    /// Returns `true` when the failure is visible (no data has ever loaded);
    /// otherwise the last good snapshot stays on screen untouched.
    pub fn record_failure(&mut self, generation: u64, error: &FeedError) -> bool {
        if matches!(self.status, LoadStatus::Loaded) || generation <= self.applied_generation {
            warn!("refresh #{generation} failed, keeping last good data: {error}");
            return false;
        }

        if error.is_decode() {
            warn!("initial feed could not be decoded: {error}");
        } else {
            warn!("initial feed fetch failed: {error}");
        }
        self.status = LoadStatus::Failed(FIRST_LOAD_ERROR.to_string());
        true
    }

    /// Single entry point for row and marker clicks.
    pub fn select(&mut self, id: &str) -> Option<DetailView> {
        let detail = self.view.select(&self.store, id);
        if detail.is_none() {
            debug!(id, "ignoring selection of unknown record");
        }
        detail
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.store.stats()
    }

    #[must_use]
    pub fn table(&self) -> TableView {
        let load_error = match &self.status {
            LoadStatus::Failed(message) => Some(message.as_str()),
            LoadStatus::Pending | LoadStatus::Loaded => None,
        };
        self.view.table(&self.store, load_error)
    }

    #[must_use]
    pub fn details(&self) -> Option<DetailView> {
        self.view.details(&self.store)
    }

    #[must_use]
    pub fn highlighted(&self) -> Option<&str> {
        self.view.highlighted()
    }

    #[must_use]
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.store.all()
    }

    #[must_use]
    pub fn map(&self) -> &M {
        self.view.map()
    }
}

/// Channel for [`Notice`]s. Capacity only bounds lagging subscribers.
#[must_use]
pub fn notice_channel() -> broadcast::Sender<Notice> {
    let (tx, _rx) = broadcast::channel(64);
    tx
}
