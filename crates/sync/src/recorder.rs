// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Producer entry point: deliver now if possible, otherwise queue.
//!
//! Every event gets its record id before the first attempt. The same id is
//! the idempotency token for the direct attempt and for any later drain, so
//! a delivery that reached the remote but failed on the way back is not
//! counted twice.

use std::sync::Arc;

use tb_core::{Collection, EventPayload, QueueStore, SessionPayload, SessionRef};

use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncResult;
use crate::remote::{EventDelivery, RemoteApi, SessionStart};
use crate::scheduler::SyncTrigger;

/// Result of [`ActionRecorder::record_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Delivered directly; nothing was stored.
    Delivered { id: String },
    /// Stored in the queue for a later drain.
    Queued { id: String },
}

impl EventOutcome {
    pub fn id(&self) -> &str {
        match self {
            EventOutcome::Delivered { id } | EventOutcome::Queued { id } => id,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, EventOutcome::Queued { .. })
    }
}

/// Result of [`ActionRecorder::start_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Started remotely.
    Remote { session_id: String },
    /// Stored in the queue; events should reference the local id.
    Queued { local_id: String },
}

impl SessionOutcome {
    /// The reference events in this session should carry.
    pub fn session_ref(&self) -> SessionRef {
        match self {
            SessionOutcome::Remote { session_id } => SessionRef::Remote(session_id.clone()),
            SessionOutcome::Queued { local_id } => SessionRef::Local(local_id.clone()),
        }
    }
}

/// Records user actions against the remote, falling back to the queue.
pub struct ActionRecorder {
    queue: Arc<QueueStore>,
    remote: Arc<dyn RemoteApi>,
    connectivity: Arc<ConnectivityMonitor>,
    trigger: Option<SyncTrigger>,
}

impl ActionRecorder {
    pub fn new(
        queue: Arc<QueueStore>,
        remote: Arc<dyn RemoteApi>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        ActionRecorder {
            queue,
            remote,
            connectivity,
            trigger: None,
        }
    }

    /// Request a drain when an event is queued behind a session that has
    /// not synced yet.
    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Record one counter event.
    ///
    /// Only storage failures are returned as errors; delivery failures fall
    /// back to the queue.
    pub async fn record_event(&self, payload: EventPayload) -> SyncResult<EventOutcome> {
        let id = self.queue.new_id(Collection::Events);

        if self.connectivity.is_online() {
            match self.direct_session_id(&payload.session)? {
                Some(session_id) => {
                    let delivery = EventDelivery::new(&id, session_id, &payload);
                    match self.remote.deliver_event(delivery).await {
                        Ok(()) => {
                            tracing::debug!("event {} delivered directly", id);
                            return Ok(EventOutcome::Delivered { id });
                        }
                        Err(e) => {
                            tracing::warn!("direct delivery of {} failed, queueing: {}", id, e);
                        }
                    }
                }
                None => {
                    self.queue.enqueue_with_id(&id, &payload)?;
                    tracing::debug!("event {} queued behind unsynced session", id);
                    if let Some(trigger) = &self.trigger {
                        trigger.request();
                    }
                    return Ok(EventOutcome::Queued { id });
                }
            }
        }

        self.queue.enqueue_with_id(&id, &payload)?;
        tracing::debug!("event {} queued", id);
        Ok(EventOutcome::Queued { id })
    }

    /// Start a session.
    pub async fn start_session(&self, payload: SessionPayload) -> SyncResult<SessionOutcome> {
        if self.connectivity.is_online() {
            match self.remote.start_session(SessionStart::from(&payload)).await {
                Ok(session) => {
                    tracing::debug!("session {} started", session.session_id);
                    return Ok(SessionOutcome::Remote {
                        session_id: session.session_id,
                    });
                }
                Err(e) => tracing::warn!("session start failed, queueing: {}", e),
            }
        }

        let local_id = self.queue.enqueue(&payload)?;
        tracing::debug!("session {} queued", local_id);
        Ok(SessionOutcome::Queued { local_id })
    }

    /// Remote session id usable right now, if any.
    fn direct_session_id(&self, session: &SessionRef) -> SyncResult<Option<String>> {
        match session {
            SessionRef::Remote(id) => Ok(Some(id.clone())),
            SessionRef::Local(local_id) => Ok(self.queue.resolve_session(local_id)?),
        }
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
