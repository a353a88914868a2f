//! Dashboard statistics view.
//!
//! A pure read over `/stats/`. Refreshes keep the last good snapshot
//! visible on failure; [`StatsPoller`] drives the periodic cadence with a
//! lifecycle-owned timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::model::DashboardStats;
use crate::poller::PollHandle;

/// Holder for the latest aggregate statistics.
#[derive(Debug, Default)]
pub struct DashboardView {
    stats: Option<DashboardStats>,
    last_error: Option<String>,
}

impl DashboardView {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently fetched statistics, kept through failed
    /// refreshes.
    #[must_use]
    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    /// Message from the last failed refresh; cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Applies a fetch outcome: a success replaces the snapshot, a
    /// failure records its message and keeps the previous snapshot.
    pub fn apply(&mut self, outcome: Result<DashboardStats, ClientError>) {
        match outcome {
            Ok(stats) => {
                debug!(total = stats.total_predictions, "dashboard stats refreshed");
                self.stats = Some(stats);
                self.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "dashboard stats refresh failed");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Fetches fresh statistics.
    ///
    /// # Errors
    ///
    /// The gateway error; the previous statistics stay visible.
    pub async fn refresh<G: Gateway + ?Sized>(&mut self, gateway: &G) -> ClientResult<()> {
        let outcome = gateway.stats().await;
        match outcome {
            Ok(stats) => {
                self.apply(Ok(stats));
                Ok(())
            }
            Err(e) => {
                self.apply(Err(e.clone()));
                Err(e)
            }
        }
    }
}

/// Periodic stats refresher.
///
/// Owns the shared [`DashboardView`] and the timer task refreshing it.
/// Refresh failures are swallowed into the view's error message; the
/// timer stops when the poller is shut down or dropped.
#[derive(Debug)]
pub struct StatsPoller {
    view: Arc<Mutex<DashboardView>>,
    handle: PollHandle,
}

impl StatsPoller {
    /// Starts polling `gateway` every `interval`.
    #[must_use]
    pub fn start(gateway: Arc<dyn Gateway>, interval: Duration) -> Self {
        let view = Arc::new(Mutex::new(DashboardView::new()));
        let poll_view = view.clone();
        let handle = PollHandle::spawn(interval, move || {
            let gateway = gateway.clone();
            let view = poll_view.clone();
            async move {
                let outcome = gateway.stats().await;
                view.lock().apply(outcome);
            }
        });
        info!(interval = ?interval, "dashboard stats poller started");
        Self { view, handle }
    }

    /// The latest statistics, if any refresh has succeeded yet.
    #[must_use]
    pub fn stats(&self) -> Option<DashboardStats> {
        self.view.lock().stats().cloned()
    }

    /// Message from the last failed refresh.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.view.lock().last_error().map(str::to_string)
    }

    /// Fetches immediately, outside the timer cadence.
    ///
    /// # Errors
    ///
    /// The gateway error; also recorded on the view.
    pub async fn refresh_now<G: Gateway + ?Sized>(&self, gateway: &G) -> ClientResult<()> {
        let outcome = gateway.stats().await;
        match outcome {
            Ok(stats) => {
                self.view.lock().apply(Ok(stats));
                Ok(())
            }
            Err(e) => {
                self.view.lock().apply(Err(e.clone()));
                Err(e)
            }
        }
    }

    /// Stops the timer. Idempotent.
    pub fn shutdown(&mut self) {
        self.handle.shutdown();
    }
}
