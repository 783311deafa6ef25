// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background tasks driving the sync engine and the retention job.
//!
//! Two tokio tasks are spawned once at startup, each with a child of a shared
//! shutdown token so they can be stopped separately or together:
//!
//! - sync: drains on every interval tick while online, on every online edge,
//!   and whenever a producer requests one through [`SyncTrigger`]
//! - retention: sweeps old synced records on its own interval
//!
//! Both intervals fire once immediately on start.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::connectivity::{ConnectivityMonitor, StatusChange, Subscription};
use crate::engine::SyncEngine;
use crate::retention::RetentionJob;

/// Default period between interval drains.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default period between retention sweeps.
pub const DEFAULT_RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Timer periods for [`BackgroundTasks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub sync: Duration,
    pub retention: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Intervals {
            sync: DEFAULT_SYNC_INTERVAL,
            retention: DEFAULT_RETENTION_INTERVAL,
        }
    }
}

/// Requests an out-of-band drain.
///
/// Requests made while a drain is running are coalesced into one follow-up
/// drain.
#[derive(Clone, Default)]
pub struct SyncTrigger {
    notify: Arc<Notify>,
}

impl SyncTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the sync task to drain as soon as it is free.
    pub fn request(&self) {
        self.notify.notify_one();
    }

    pub(crate) async fn requested(&self) {
        self.notify.notified().await;
    }
}

/// Handles for the running background tasks.
pub struct BackgroundTasks {
    shutdown: CancellationToken,
    sync_cancel: CancellationToken,
    retention_cancel: CancellationToken,
    trigger: SyncTrigger,
    sync_task: JoinHandle<()>,
    retention_task: JoinHandle<()>,
    _online: Subscription,
}

impl BackgroundTasks {
    /// Spawn both tasks on the current tokio runtime.
    pub fn start(
        engine: Arc<SyncEngine>,
        retention: RetentionJob,
        monitor: &ConnectivityMonitor,
        intervals: Intervals,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let sync_cancel = shutdown.child_token();
        let retention_cancel = shutdown.child_token();
        let trigger = SyncTrigger::new();

        let online = monitor.on_status_change({
            let trigger = trigger.clone();
            move |change| {
                if change == StatusChange::CameOnline {
                    trigger.request();
                }
            }
        });

        let sync_task = tokio::spawn(run_sync_loop(
            engine,
            trigger.clone(),
            intervals.sync,
            sync_cancel.clone(),
        ));
        let retention_task = tokio::spawn(run_retention_loop(
            retention,
            intervals.retention,
            retention_cancel.clone(),
        ));

        tracing::info!(
            sync_interval_secs = intervals.sync.as_secs(),
            retention_interval_secs = intervals.retention.as_secs(),
            "background tasks started"
        );

        BackgroundTasks {
            shutdown,
            sync_cancel,
            retention_cancel,
            trigger,
            sync_task,
            retention_task,
            _online: online,
        }
    }

    /// A handle producers can use to request a drain.
    pub fn trigger(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    /// Stop the sync task. An in-flight drain finishes first.
    pub fn cancel_sync(&self) {
        self.sync_cancel.cancel();
    }

    /// Stop the retention task.
    pub fn cancel_retention(&self) {
        self.retention_cancel.cancel();
    }

    /// Whether the sync task has exited.
    pub fn is_sync_finished(&self) -> bool {
        self.sync_task.is_finished()
    }

    /// Whether the retention task has exited.
    pub fn is_retention_finished(&self) -> bool {
        self.retention_task.is_finished()
    }

    /// Stop both tasks and wait for them to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.sync_task.await {
            tracing::warn!("sync task ended abnormally: {}", e);
        }
        if let Err(e) = self.retention_task.await {
            tracing::warn!("retention task ended abnormally: {}", e);
        }
        tracing::info!("background tasks stopped");
    }
}

async fn run_sync_loop(
    engine: Arc<SyncEngine>,
    trigger: SyncTrigger,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let reason = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !engine.is_online() {
                    continue;
                }
                "interval"
            }
            _ = trigger.requested() => "trigger",
        };

        let report = engine.sync_queue().await;
        tracing::debug!(reason, outcome = ?report.outcome, "drain finished");
    }
    tracing::debug!("sync task stopped");
}

async fn run_retention_loop(job: RetentionJob, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Sweeps run SQLite deletes; keep them off the async workers.
        let sweep = job.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || sweep.run()).await {
            tracing::warn!("retention sweep panicked: {}", e);
        }
    }
    tracing::debug!("retention task stopped");
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
