//! Periodic feed refresh.
//!
//! One refresh cycle is fetch → apply (or record the failure) → notify.
//! The first cycle runs immediately, then one starts every interval whether
//! or not the previous one finished. Each cycle carries a generation ticket
//! so a slow fetch can never overwrite a newer snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::client::FeedSource;
use crate::dashboard::{Notice, SharedDashboard};
use crate::view::{MapWidget, MarkerLayer};

/// Default time between refreshes (five minutes).
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Shortest refresh interval accepted; the upstream feed updates every minute.
pub const MIN_REFRESH_SECS: u64 = 30;

/// Whether any fetch is currently outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
}

/// What a single refresh cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot replaced the store
    Applied { records: usize },
    /// A newer snapshot had already been applied
    Stale,
    /// Fetch or decode failed
    Failed,
}

/// Drives refresh cycles against a [`FeedSource`].
pub struct RefreshScheduler<S, M = MarkerLayer> {
    source: S,
    dashboard: SharedDashboard<M>,
    notices: broadcast::Sender<Notice>,
    interval: Duration,
    next_generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl<S, M> RefreshScheduler<S, M>
where
    S: FeedSource,
    M: MapWidget + Send + Sync + 'static,
{
    pub fn new(
        source: S,
        dashboard: SharedDashboard<M>,
        notices: broadcast::Sender<Notice>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            dashboard,
            notices,
            interval,
            next_generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.in_flight.load(Ordering::Acquire) == 0 {
            Phase::Idle
        } else {
            Phase::Fetching
        }
    }

    /// Run one refresh cycle to completion.
    ///
    /// The dashboard lock is only taken after the fetch resolves, never
    /// across it.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        debug!(generation, "refresh started");

        let result = self.source.fetch().await;

        let (outcome, notify) = {
            let mut dashboard = self.dashboard.write().await;
            match result {
                Ok(records) => {
                    let count = records.len();
                    if dashboard.apply_snapshot(generation, records) {
                        (RefreshOutcome::Applied { records: count }, true)
                    } else {
                        (RefreshOutcome::Stale, false)
                    }
                }
                Err(e) => {
                    let visible = dashboard.record_failure(generation, &e);
                    (RefreshOutcome::Failed, visible)
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if notify {
            // No subscribers is fine: nobody is looking.
            let _ = self.notices.send(Notice::Refreshed);
        }
        debug!(generation, ?outcome, "refresh finished");
        outcome
    }

    /// Refresh forever: now, then every interval.
    ///
    /// Each cycle runs on its own task, so a slow fetch never delays the
    /// next tick.
    pub async fn run(self: Arc<Self>) {
        info!("refreshing every {}s", self.interval.as_secs());

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.phase() == Phase::Fetching {
                debug!("previous refresh still outstanding, starting another");
            }
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.refresh_once().await;
            });
        }
    }
}

/// Clamp a requested interval to [`MIN_REFRESH_SECS`].
///
/// Returns the interval to use and whether it was changed.
#[must_use]
pub fn clamp_refresh_secs(requested: u64) -> (u64, bool) {
    let secs = requested.max(MIN_REFRESH_SECS);
    (secs, secs != requested)
}
