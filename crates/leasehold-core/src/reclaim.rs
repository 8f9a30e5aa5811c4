//! Reclamation of abandoned leases
//!
//! `LockManager::clean_expired_locks` is the periodic job. Hosts with their
//! own scheduler call it directly; others can spawn a `Reclaimer`, which runs
//! it every `LockSettings::reclaim_interval` until shut down.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::error::LockResult;
use crate::manager::LockManager;
use crate::settings::LockSettings;

pub struct Reclaimer {
    manager: LockManager,
    settings: LockSettings,
}

impl Reclaimer {
    pub fn new(manager: LockManager, settings: LockSettings) -> Self {
        Self { manager, settings }
    }

    /// Run a single sweep
    pub async fn run_once(&self) -> LockResult<u64> {
        self.manager.clean_expired_locks(&self.settings).await
    }

    /// Sweep on every tick until a stop signal arrives. A failed sweep is
    /// logged and retried on the next tick.
    pub async fn run(self, mut stop_rx: mpsc::Receiver<()>) {
        let mut ticker = interval(self.settings.reclaim_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!("Lock reclamation sweep failed: {}", e);
                    }
                }
                _ = stop_rx.recv() => {
                    break;
                }
            }
        }

        tracing::debug!("Lock reclaimer stopped");
    }

    /// Spawn the sweep loop on the current runtime
    pub fn spawn(self) -> ReclaimerHandle {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        tracing::info!(
            interval_ms = self.settings.reclaim_interval.as_millis() as u64,
            implicit_max_age = ?self.settings.implicit_max_age(),
            "Starting lock reclaimer"
        );
        let join = tokio::spawn(self.run(stop_rx));
        ReclaimerHandle { stop_tx, join }
    }
}

/// Handle to a spawned `Reclaimer`
pub struct ReclaimerHandle {
    stop_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Signal the loop to stop without waiting for it
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// Stop the loop and wait for the current sweep to finish
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.join.await {
            tracing::warn!("Lock reclaimer task ended abnormally: {}", e);
        }
    }
}
