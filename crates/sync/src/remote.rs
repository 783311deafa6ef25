// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote API abstraction.
//!
//! Provides a trait-based remote layer that enables:
//! - A real HTTP client for production ([`crate::HttpRemote`])
//! - Mock remotes for unit testing

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tb_core::{EventKind, EventPayload, SessionPayload};

/// Error type for remote calls.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Could not reach the remote service.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The remote answered with a non-success status.
    #[error("remote rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteApi`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Request body for delivering one counter event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDelivery {
    pub session_id: String,
    pub delta: i64,
    pub event_type: EventKind,
    /// The queue record id. Repeated deliveries with the same token must be
    /// no-ops on the remote side after the first success.
    pub idempotency_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prayer_segment: Option<String>,
}

impl EventDelivery {
    /// Build a delivery for `payload` under the given token and resolved session id.
    pub fn new(idempotency_token: &str, session_id: String, payload: &EventPayload) -> Self {
        EventDelivery {
            session_id,
            delta: payload.delta,
            event_type: payload.kind,
            idempotency_token: idempotency_token.to_string(),
            prayer_segment: payload.prayer_segment.clone(),
        }
    }
}

/// Request body for starting a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prayer_segment: Option<String>,
}

impl From<&SessionPayload> for SessionStart {
    fn from(payload: &SessionPayload) -> Self {
        SessionStart {
            goal_id: payload.goal_id.clone(),
            category: payload.category.clone(),
            prayer_segment: payload.prayer_segment.clone(),
        }
    }
}

/// Successful session start response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub session_id: String,
}

/// The remote service the queue drains into.
///
/// This trait abstracts over the actual remote mechanism, allowing
/// for easy testing with mock implementations.
pub trait RemoteApi: Send + Sync {
    /// Deliver one counter event.
    fn deliver_event(&self, delivery: EventDelivery) -> RemoteFuture<'_, ()>;

    /// Start a session, returning the server-assigned id.
    fn start_session(&self, start: SessionStart) -> RemoteFuture<'_, RemoteSession>;
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
