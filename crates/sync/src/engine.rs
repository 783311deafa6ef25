// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine: drains the offline queue into the remote API.
//!
//! Each engine instance moves between two states, `Idle -> Draining -> Idle`.
//! A drain requested while another is running, or while offline, returns a
//! zero report without touching the queue.
//!
//! Drain algorithm:
//! 1. List unsynced sessions; skip dead ones; start each remotely and record
//!    the server-issued id alongside the synced flag
//! 2. List unsynced events; skip dead ones
//! 3. Resolve each event's session reference; events whose local session has
//!    not synced yet are deferred without spending a retry
//! 4. Deliver each event with its record id as idempotency token
//! 5. Mark successes synced, bump the retry count of failures, keep going
//!
//! Rows that no longer decode count as failed attempts and dead-letter like
//! any other record. If one collection cannot be listed at all, the other
//! still drains.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tb_core::{
    Collection, EventPayload, QueueRecord, QueueStore, RecordState, SessionPayload, SessionRef,
    UndecodableRecord, DEFAULT_MAX_RETRY,
};

use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncResult;
use crate::remote::{EventDelivery, RemoteApi, SessionStart};

const STATE_IDLE: u8 = 0;
const STATE_DRAINING: u8 = 1;

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No drain in progress.
    Idle,
    /// A drain is running.
    Draining,
}

/// How a `sync_queue` call ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A full drain ran.
    #[default]
    Completed,
    /// Skipped because the connectivity signal was offline.
    Offline,
    /// Skipped because another drain on this engine was running.
    AlreadyDraining,
}

/// Counts from one `sync_queue` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced_events: usize,
    pub failed_events: usize,
    /// Events waiting on a local session that has not synced yet.
    pub deferred_events: usize,
    pub synced_sessions: usize,
    pub failed_sessions: usize,
    /// Records skipped because their retry budget is exhausted.
    pub dead_letters: usize,
    /// Collections that could not be read this drain.
    pub listing_failures: usize,
    pub outcome: DrainOutcome,
}

impl SyncReport {
    fn skipped(outcome: DrainOutcome) -> Self {
        SyncReport { outcome, ..SyncReport::default() }
    }

    /// Number of delivery attempts made.
    pub fn attempted(&self) -> usize {
        self.synced_events + self.failed_events + self.synced_sessions + self.failed_sessions
    }

    /// True if every count is zero.
    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
            && self.deferred_events == 0
            && self.dead_letters == 0
            && self.listing_failures == 0
    }
}

/// Where an event's session reference points.
enum SessionResolution {
    /// Deliverable under this remote id.
    Resolved(String),
    /// Parent session still queued and retryable.
    Pending,
    /// Parent session can never provide an id.
    Unresolvable(&'static str),
}

/// Resets the engine to idle when a drain ends, including on early return.
struct DrainGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.state.store(STATE_IDLE, Ordering::Release);
    }
}

/// Drains the queue against a remote API.
pub struct SyncEngine {
    queue: Arc<QueueStore>,
    remote: Arc<dyn RemoteApi>,
    connectivity: Arc<ConnectivityMonitor>,
    max_retry: u32,
    state: AtomicU8,
}

impl SyncEngine {
    /// Create an engine with the default retry budget.
    pub fn new(
        queue: Arc<QueueStore>,
        remote: Arc<dyn RemoteApi>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        SyncEngine {
            queue,
            remote,
            connectivity,
            max_retry: DEFAULT_MAX_RETRY,
            state: AtomicU8::new(STATE_IDLE),
        }
    }

    /// Override the retry budget.
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// The retry budget.
    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        match self.state.load(Ordering::Acquire) {
            STATE_DRAINING => EngineState::Draining,
            _ => EngineState::Idle,
        }
    }

    /// Whether the connectivity signal is online.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// The queue this engine drains.
    pub fn queue(&self) -> &Arc<QueueStore> {
        &self.queue
    }

    /// Drain both collections once.
    ///
    /// Delivery failures never abort the drain. A collection that cannot be
    /// read is logged and counted, and the other collection still drains.
    pub async fn sync_queue(&self) -> SyncReport {
        if !self.connectivity.is_online() {
            tracing::debug!("offline, skipping drain");
            return SyncReport::skipped(DrainOutcome::Offline);
        }

        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_DRAINING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("drain already in progress");
            return SyncReport::skipped(DrainOutcome::AlreadyDraining);
        }
        let _guard = DrainGuard { state: &self.state };

        let mut report = SyncReport::default();
        if let Err(e) = self.drain_sessions(&mut report).await {
            tracing::warn!("failed to list queued sessions: {}", e);
            report.listing_failures += 1;
        }
        if let Err(e) = self.drain_events(&mut report).await {
            tracing::warn!("failed to list queued events: {}", e);
            report.listing_failures += 1;
        }

        if !report.is_empty() {
            tracing::info!(
                synced_events = report.synced_events,
                failed_events = report.failed_events,
                deferred_events = report.deferred_events,
                synced_sessions = report.synced_sessions,
                failed_sessions = report.failed_sessions,
                dead_letters = report.dead_letters,
                listing_failures = report.listing_failures,
                "drain complete"
            );
        }
        report
    }

    /// Split off dead records, counting them in the report.
    fn retryable<P>(
        &self,
        records: Vec<QueueRecord<P>>,
        report: &mut SyncReport,
    ) -> Vec<QueueRecord<P>> {
        let (live, dead): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.state(self.max_retry) == RecordState::Pending);
        report.dead_letters += dead.len();
        live
    }

    /// Count rows that no longer decode as failed attempts so they
    /// dead-letter like any other record.
    fn settle_undecodable(
        &self,
        collection: Collection,
        rows: Vec<UndecodableRecord>,
        report: &mut SyncReport,
    ) {
        for row in rows {
            if row.retry_count >= self.max_retry {
                report.dead_letters += 1;
                continue;
            }
            tracing::warn!("{} {} cannot be decoded: {}", collection, row.id, row.reason);
            match collection {
                Collection::Events => report.failed_events += 1,
                Collection::Sessions => report.failed_sessions += 1,
            }
            self.bump_retry(collection, &row.id);
        }
    }

    async fn drain_sessions(&self, report: &mut SyncReport) -> SyncResult<()> {
        let scan = self.queue.scan_unsynced::<SessionPayload>()?;
        self.settle_undecodable(Collection::Sessions, scan.undecodable, report);
        let records = self.retryable(scan.records, report);

        for record in records {
            match self.remote.start_session(SessionStart::from(&record.payload)).await {
                Ok(session) => {
                    match self.queue.mark_session_synced(&record.id, &session.session_id) {
                        Ok(_) => {
                            tracing::debug!(
                                local_id = %record.id,
                                remote_id = %session.session_id,
                                "session synced"
                            );
                            report.synced_sessions += 1;
                        }
                        Err(e) => {
                            tracing::warn!("failed to mark session {} synced: {}", record.id, e);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("session {} delivery failed: {}", record.id, e);
                    report.failed_sessions += 1;
                    self.bump_retry(Collection::Sessions, &record.id);
                }
            }
        }
        Ok(())
    }

    async fn drain_events(&self, report: &mut SyncReport) -> SyncResult<()> {
        let scan = self.queue.scan_unsynced::<EventPayload>()?;
        self.settle_undecodable(Collection::Events, scan.undecodable, report);
        let records = self.retryable(scan.records, report);

        for record in records {
            let session_id = match self.resolve_session(&record.payload.session) {
                Ok(SessionResolution::Resolved(id)) => id,
                Ok(SessionResolution::Pending) => {
                    tracing::debug!(
                        "event {} waiting on session {}",
                        record.id,
                        record.payload.session.id()
                    );
                    report.deferred_events += 1;
                    continue;
                }
                Ok(SessionResolution::Unresolvable(reason)) => {
                    tracing::warn!("event {} undeliverable: {}", record.id, reason);
                    report.failed_events += 1;
                    self.bump_retry(Collection::Events, &record.id);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("failed to resolve session for event {}: {}", record.id, e);
                    continue;
                }
            };

            let delivery = EventDelivery::new(&record.id, session_id, &record.payload);
            match self.remote.deliver_event(delivery).await {
                Ok(()) => match self.queue.mark_synced(Collection::Events, &record.id) {
                    Ok(_) => {
                        tracing::debug!("event {} synced", record.id);
                        report.synced_events += 1;
                    }
                    Err(e) => {
                        tracing::warn!("failed to mark event {} synced: {}", record.id, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("event {} delivery failed: {}", record.id, e);
                    report.failed_events += 1;
                    self.bump_retry(Collection::Events, &record.id);
                }
            }
        }
        Ok(())
    }

    fn resolve_session(&self, session: &SessionRef) -> SyncResult<SessionResolution> {
        let local_id = match session {
            SessionRef::Remote(id) => return Ok(SessionResolution::Resolved(id.clone())),
            SessionRef::Local(id) => id,
        };

        if let Some(remote_id) = self.queue.resolve_session(local_id)? {
            return Ok(SessionResolution::Resolved(remote_id));
        }

        let state = self
            .queue
            .state_of(Collection::Sessions, local_id, self.max_retry)?;
        let resolution = match state {
            None => SessionResolution::Unresolvable("parent session missing"),
            Some(RecordState::Synced) => {
                SessionResolution::Unresolvable("parent session synced without a remote id")
            }
            Some(RecordState::Dead) => {
                SessionResolution::Unresolvable("parent session dead-lettered")
            }
            Some(RecordState::Pending) => SessionResolution::Pending,
        };
        Ok(resolution)
    }

    fn bump_retry(&self, collection: Collection, id: &str) {
        if let Err(e) = self.queue.increment_retry(collection, id) {
            tracing::warn!("failed to bump retry count of {} {}: {}", collection, id, e);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
