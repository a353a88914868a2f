//! Periodic task handle.
//!
//! [`PollHandle`] owns one spawned timer loop and its shutdown signal, so
//! every recurring fetch in the crate is tied to the lifecycle of whoever
//! holds the handle. Dropping the handle cancels the loop; there are no
//! ambient timers.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Handle to a running periodic task.
#[derive(Debug)]
pub struct PollHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawns a loop that awaits `tick` once per `interval`.
    ///
    /// The first tick fires one full interval after spawn; missed ticks
    /// are delayed rather than bursted. The loop exits when the handle is
    /// shut down or dropped.
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick resolves immediately; consume it so
            // the cadence starts one interval after spawn.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("poll task shutting down");
                        break;
                    }
                    _ = ticker.tick() => tick().await,
                }
            }
        });
        Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        }
    }

    /// `true` until the task has been told to stop.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Signals the task to stop. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Signals the task to stop and waits for it to finish.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
