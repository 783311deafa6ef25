// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tb_core::{EventPayload, ManualClock, QueueStore, SessionPayload, SessionRef};
use tokio::sync::{Notify, Semaphore};

use crate::connectivity::ConnectivityMonitor;
use crate::remote::{
    EventDelivery, RemoteApi, RemoteError, RemoteFuture, RemoteSession, SessionStart,
};

/// Remote that records calls and fails on demand.
#[derive(Default)]
pub struct MockRemote {
    pub fail_events: AtomicBool,
    pub fail_sessions: AtomicBool,
    /// Event tokens that always fail, regardless of `fail_events`.
    pub fail_tokens: Mutex<HashSet<String>>,
    pub events: Mutex<Vec<EventDelivery>>,
    pub sessions: Mutex<Vec<SessionStart>>,
    next_session: AtomicU64,
    gate: Option<Arc<Semaphore>>,
    /// Notified each time a call reaches the gate.
    pub entered: Arc<Notify>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A remote whose calls block until the returned semaphore gets permits.
    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let remote = MockRemote {
            gate: Some(Arc::clone(&gate)),
            ..MockRemote::default()
        };
        (Arc::new(remote), gate)
    }

    pub fn failing() -> Arc<Self> {
        let remote = Self::default();
        remote.fail_events.store(true, Ordering::SeqCst);
        remote.fail_sessions.store(true, Ordering::SeqCst);
        Arc::new(remote)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_events.store(failing, Ordering::SeqCst);
        self.fail_sessions.store(failing, Ordering::SeqCst);
    }

    pub fn fail_token(&self, token: &str) {
        self.fail_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn delivered(&self) -> Vec<EventDelivery> {
        self.events.lock().unwrap().clone()
    }

    pub fn delivered_tokens(&self) -> Vec<String> {
        self.delivered().into_iter().map(|d| d.idempotency_token).collect()
    }

    pub fn started(&self) -> Vec<SessionStart> {
        self.sessions.lock().unwrap().clone()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.acquire().await.unwrap().forget();
        }
    }
}

impl RemoteApi for MockRemote {
    fn deliver_event(&self, delivery: EventDelivery) -> RemoteFuture<'_, ()> {
        Box::pin(async move {
            self.pass_gate().await;
            let rejected = self.fail_events.load(Ordering::SeqCst)
                || self.fail_tokens.lock().unwrap().contains(&delivery.idempotency_token);
            self.events.lock().unwrap().push(delivery);
            if rejected {
                return Err(RemoteError::ConnectionFailed("mock offline".into()));
            }
            Ok(())
        })
    }

    fn start_session(&self, start: SessionStart) -> RemoteFuture<'_, RemoteSession> {
        Box::pin(async move {
            self.pass_gate().await;
            self.sessions.lock().unwrap().push(start);
            if self.fail_sessions.load(Ordering::SeqCst) {
                return Err(RemoteError::Rejected {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            let n = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RemoteSession {
                session_id: format!("srv-{n}"),
            })
        })
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 5, 30, 0).unwrap()
}

pub fn clocked_queue() -> (Arc<QueueStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(epoch()));
    let queue = QueueStore::open_in_memory_with_clock(clock.clone()).unwrap();
    (Arc::new(queue), clock)
}

pub fn online() -> Arc<ConnectivityMonitor> {
    Arc::new(ConnectivityMonitor::new(true))
}

pub fn offline() -> Arc<ConnectivityMonitor> {
    Arc::new(ConnectivityMonitor::new(false))
}

pub fn tap_in(session: SessionRef, value_after: i64) -> EventPayload {
    EventPayload::tap(session, "dhikr", "subhanallah", value_after, epoch())
}

pub fn tap(value_after: i64) -> EventPayload {
    tap_in(SessionRef::Remote("srv-live".into()), value_after)
}

pub fn session() -> SessionPayload {
    SessionPayload::started(Some("goal-1".into()), epoch())
}
