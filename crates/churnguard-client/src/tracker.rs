//! Population tracker: the lifecycle owner of the population view.
//!
//! [`PopulationTracker`] holds the [`PopulationView`] behind a lock and
//! owns the two timer tasks around it: a debounce task that turns a
//! stream of filter edits into page-1 fetches after 500 ms of quiescence,
//! and a poll task refreshing the unfiltered first page on a fixed
//! cadence. Both stop when the tracker is shut down or dropped.
//!
//! The lock is never held across a gateway await: every path locks to
//! plan, releases, performs the round-trip, then re-locks to apply. The
//! view's epoch discipline serializes whatever interleavings the timer
//! tasks and user calls produce.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::gateway::Gateway;
use crate::metrics::{SyncMetrics, SyncMetricsSnapshot};
use crate::model::{PopulationFilter, StatusTab};
use crate::poller::PollHandle;
use crate::population::{Applied, PopulationSnapshot, PopulationView};

/// Owns the population view and its timer tasks.
pub struct PopulationTracker {
    view: Arc<Mutex<PopulationView>>,
    gateway: Arc<dyn Gateway>,
    metrics: Arc<SyncMetrics>,
    /// Latest edited filter, ahead of whatever the debounce has applied.
    draft_filter: Mutex<PopulationFilter>,
    edits_tx: mpsc::UnboundedSender<PopulationFilter>,
    debounce_shutdown: Option<oneshot::Sender<()>>,
    debounce_task: Option<JoinHandle<()>>,
    poll: PollHandle,
}

impl PopulationTracker {
    /// Starts the tracker: spawns the debounce and poll tasks.
    ///
    /// The view starts empty; call [`PopulationTracker::refresh`] to load
    /// the first page immediately rather than waiting for an edit or a
    /// poll tick.
    #[must_use]
    pub fn start(gateway: Arc<dyn Gateway>, config: &ClientConfig) -> Self {
        let metrics = Arc::new(SyncMetrics::new());
        let view = Arc::new(Mutex::new(PopulationView::with_metrics(metrics.clone())));

        let (edits_tx, edits_rx) = mpsc::unbounded_channel();
        let (debounce_shutdown, shutdown_rx) = oneshot::channel();
        let debounce_task = tokio::spawn(debounce_loop(
            view.clone(),
            gateway.clone(),
            edits_rx,
            shutdown_rx,
            config.debounce,
        ));

        let poll_view = view.clone();
        let poll_gateway = gateway.clone();
        let poll = PollHandle::spawn(config.poll_interval, move || {
            let view = poll_view.clone();
            let gateway = poll_gateway.clone();
            async move {
                // Plan under the lock, release it for the round-trip.
                let plan = view.lock().begin_poll();
                if let Some(plan) = plan {
                    let outcome = gateway.customers(plan.page, &plan.filter).await;
                    view.lock().apply(&plan, outcome);
                }
            }
        });

        info!(
            debounce = ?config.debounce,
            poll_interval = ?config.poll_interval,
            "population tracker started"
        );
        Self {
            view,
            gateway,
            metrics,
            draft_filter: Mutex::new(PopulationFilter::neutral()),
            edits_tx,
            debounce_shutdown: Some(debounce_shutdown),
            debounce_task: Some(debounce_task),
            poll,
        }
    }

    // ── Filter edits (debounced) ──

    /// Records a filter edit; the page-1 fetch fires after the debounce
    /// window of quiescence, scoped to the last edit at fire time.
    pub fn edit_filter(&self, filter: PopulationFilter) {
        *self.draft_filter.lock() = filter.clone();
        let _ = self.edits_tx.send(filter);
    }

    /// Edits only the search text, keeping the current status tab.
    pub fn set_search(&self, search: impl Into<String>) {
        let filter = {
            let mut draft = self.draft_filter.lock();
            draft.search = search.into();
            draft.clone()
        };
        let _ = self.edits_tx.send(filter);
    }

    /// Edits only the status tab, keeping the current search text.
    pub fn set_status(&self, status: StatusTab) {
        let filter = {
            let mut draft = self.draft_filter.lock();
            draft.status = status;
            draft.clone()
        };
        let _ = self.edits_tx.send(filter);
    }

    // ── Immediate operations ──

    /// Refetches page 1 under the latest edited filter, bypassing the
    /// debounce. Used for the initial load and explicit refresh actions.
    pub async fn refresh(&self) -> Applied {
        let filter = self.draft_filter.lock().clone();
        let plan = self.view.lock().begin_filter_change(filter);
        let outcome = self.gateway.customers(plan.page, &plan.filter).await;
        self.view.lock().apply(&plan, outcome)
    }

    /// Fetches and appends the next page; `None` when load-more is not
    /// currently offered.
    pub async fn load_more(&self) -> Option<Applied> {
        let plan = self.view.lock().begin_load_more()?;
        let outcome = self.gateway.customers(plan.page, &plan.filter).await;
        Some(self.view.lock().apply(&plan, outcome))
    }

    // ── Observation ──

    /// Renderable snapshot of the current view state.
    #[must_use]
    pub fn snapshot(&self) -> PopulationSnapshot {
        self.view.lock().snapshot()
    }

    /// Synchronization counters so far.
    #[must_use]
    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    // ── Teardown ──

    /// Stops both timer tasks. Idempotent; in-flight fetches finish but
    /// no further timer activity occurs.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.debounce_shutdown.take() {
            let _ = tx.send(());
            info!("population tracker shutting down");
        }
        self.poll.shutdown();
    }

    /// Stops both timer tasks and waits for the debounce task to finish.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.debounce_task.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PopulationTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PopulationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopulationTracker")
            .field("view", &self.view.lock())
            .field("running", &self.poll.is_running())
            .finish_non_exhaustive()
    }
}

/// Debounce loop: collects filter edits and fires a page-1 fetch after
/// `debounce` of quiescence, scoped to the newest edit.
async fn debounce_loop(
    view: Arc<Mutex<PopulationView>>,
    gateway: Arc<dyn Gateway>,
    mut edits_rx: mpsc::UnboundedReceiver<PopulationFilter>,
    mut shutdown_rx: oneshot::Receiver<()>,
    debounce: std::time::Duration,
) {
    let mut pending: Option<PopulationFilter> = None;
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("debounce task shutting down");
                break;
            }
            edit = edits_rx.recv() => {
                match edit {
                    // Each edit restarts the quiescence window.
                    Some(filter) => pending = Some(filter),
                    None => break,
                }
            }
            () = tokio::time::sleep(debounce), if pending.is_some() => {
                if let Some(filter) = pending.take() {
                    let plan = view.lock().begin_filter_change(filter);
                    let outcome = gateway.customers(plan.page, &plan.filter).await;
                    view.lock().apply(&plan, outcome);
                }
            }
        }
    }
}
