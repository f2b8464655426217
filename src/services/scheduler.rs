// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily global quota reset.
//!
//! Fires at the next UTC midnight after start, then every 24 hours. A failed
//! reset is logged and skipped; accounts it missed are re-armed lazily by the
//! per-account rollover on their next spin.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::db::AccountStore;
use crate::error::SchedulerError;
use crate::models::DAILY_SPIN_ALLOTMENT;
use crate::time_utils::{duration_until_next_utc_midnight, format_utc_rfc3339, Clock};

/// Period between resets after the first one.
pub const RESET_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Background task that re-arms every account's quota.
#[derive(Clone)]
pub struct ResetScheduler {
    store: AccountStore,
    clock: Arc<dyn Clock>,
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for it to exit.
    ///
    /// A reset already in progress completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Reset scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl ResetScheduler {
    pub fn new(store: AccountStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Run one global reset now.
    pub async fn run_once(&self) -> Result<usize, SchedulerError> {
        let now = self.clock.now();
        self.store
            .reset_all(DAILY_SPIN_ALLOTMENT, now)
            .await
            .map_err(SchedulerError::StoreUnreachable)
    }

    async fn fire(&self) {
        match self.run_once().await {
            Ok(count) => tracing::info!(accounts = count, "Daily spin quota reset"),
            Err(e) => tracing::error!(error = %e, "Daily spin quota reset failed"),
        }
    }

    /// Start the scheduler on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let now = self.clock.now();
        let delay = duration_until_next_utc_midnight(now);
        tracing::info!(
            now = %format_utc_rfc3339(now),
            delay_secs = delay.as_secs(),
            "Reset scheduler armed for next UTC midnight"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                tracing::info!("Reset scheduler stopped before first reset");
                return;
            }
        }

        self.fire().await;

        // Fixed period from here on. Ticks missed while the process was stalled
        // are dropped, not replayed.
        let mut interval = tokio::time::interval_at(Instant::now() + RESET_PERIOD, RESET_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => self.fire().await,
                _ = wait_for_shutdown(&mut shutdown_rx) => break,
            }
        }

        tracing::info!("Reset scheduler stopped");
    }
}

/// Resolves once shutdown is requested or every sender is gone.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
