// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic deletion of old synced records.

use std::sync::Arc;

use chrono::Duration;
use tb_core::{Collection, QueueStore, RETENTION_HORIZON_DAYS};

/// Rows deleted by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub events_deleted: usize,
    pub sessions_deleted: usize,
    /// Collections whose sweep failed.
    pub errors: usize,
}

impl RetentionReport {
    pub fn total_deleted(&self) -> usize {
        self.events_deleted + self.sessions_deleted
    }
}

/// Deletes synced records older than the horizon from both collections.
///
/// Unsynced records, including dead ones, are never touched.
#[derive(Clone)]
pub struct RetentionJob {
    queue: Arc<QueueStore>,
    horizon: Duration,
}

impl RetentionJob {
    pub fn new(queue: Arc<QueueStore>) -> Self {
        RetentionJob {
            queue,
            horizon: Duration::days(RETENTION_HORIZON_DAYS),
        }
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Sweep both collections. A failure on one is logged and the other
    /// still runs.
    pub fn run(&self) -> RetentionReport {
        let mut report = RetentionReport::default();
        for collection in [Collection::Events, Collection::Sessions] {
            match self.queue.delete_if_stale_and_synced(collection, self.horizon) {
                Ok(deleted) => match collection {
                    Collection::Events => report.events_deleted = deleted,
                    Collection::Sessions => report.sessions_deleted = deleted,
                },
                Err(e) => {
                    tracing::warn!("retention sweep of {} failed: {}", collection, e);
                    report.errors += 1;
                }
            }
        }

        if report.total_deleted() > 0 {
            tracing::info!(
                events = report.events_deleted,
                sessions = report.sessions_deleted,
                "retention sweep complete"
            );
        }
        report
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
