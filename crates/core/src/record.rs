// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued record types.
//!
//! A [`QueueRecord`] wraps a domain action ([`EventPayload`] or
//! [`SessionPayload`]) with the bookkeeping the sync engine needs: the
//! idempotency id, capture time, synced flag, and retry count.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failed delivery attempts after which a record is dead-lettered.
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// Synced records older than this many days are eligible for deletion.
pub const RETENTION_HORIZON_DAYS: i64 = 30;

/// The two queue collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Counter taps and bulk increments.
    Events,
    /// Practice sessions.
    Sessions,
}

impl Collection {
    /// Returns the string representation used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Sessions => "sessions",
        }
    }

    /// Returns the backing table name.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Collection::Events => "queued_events",
            Collection::Sessions => "queued_sessions",
        }
    }

    /// Returns the prefix used for generated record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Collection::Events => "ev",
            Collection::Sessions => "ss",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payload type that lives in one of the queue collections.
pub trait QueuePayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection records of this payload are stored in.
    const COLLECTION: Collection;
}

/// Kind of counter event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A single tap on the counter.
    Tap,
    /// A bulk increment (e.g. "+33").
    Bulk,
}

impl EventKind {
    /// Returns the string representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Tap => "tap",
            EventKind::Bulk => "bulk",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference from an event to the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRef {
    /// Session created offline; the value is its queue record id.
    Local(String),
    /// Session id issued by the remote service.
    Remote(String),
}

impl SessionRef {
    /// Returns the raw id regardless of origin.
    pub fn id(&self) -> &str {
        match self {
            SessionRef::Local(id) | SessionRef::Remote(id) => id,
        }
    }
}

/// A counter-tap or bulk-increment action.
///
/// `value_after` is the counter value computed by the producer at capture
/// time. The queue never recomputes it, so delivery order does not affect
/// counter correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub session: SessionRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    pub category: String,
    pub item_id: String,
    pub kind: EventKind,
    pub delta: i64,
    pub value_after: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prayer_segment: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub timezone: String,
}

impl EventPayload {
    /// Creates a single-tap event with no goal or prayer segment.
    pub fn tap(
        session: SessionRef,
        category: impl Into<String>,
        item_id: impl Into<String>,
        value_after: i64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        EventPayload {
            session,
            goal_id: None,
            category: category.into(),
            item_id: item_id.into(),
            kind: EventKind::Tap,
            delta: 1,
            value_after,
            prayer_segment: None,
            captured_at,
            timezone: "UTC".to_string(),
        }
    }
}

impl QueuePayload for EventPayload {
    const COLLECTION: Collection = Collection::Events;
}

/// A practice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prayer_segment: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionPayload {
    /// Creates an open-ended session started at `started_at`.
    pub fn started(goal_id: Option<String>, started_at: DateTime<Utc>) -> Self {
        SessionPayload {
            goal_id,
            category: None,
            prayer_segment: None,
            started_at,
            ended_at: None,
        }
    }
}

impl QueuePayload for SessionPayload {
    const COLLECTION: Collection = Collection::Sessions;
}

/// Envelope pairing a payload with sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord<T> {
    /// Opaque id; also the idempotency token.
    pub id: String,
    pub payload: T,
    /// Client-side capture time. Immutable.
    pub created_at: DateTime<Utc>,
    pub synced: bool,
    pub retry_count: u32,
}

impl<T> QueueRecord<T> {
    /// Derived state given the retry cap.
    pub fn state(&self, max_retry: u32) -> RecordState {
        RecordState::of(self.synced, self.retry_count, max_retry)
    }
}

/// Observable state of a queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Unsynced and still eligible for delivery.
    Pending,
    /// Unsynced with the retry budget exhausted. Kept until it syncs.
    Dead,
    /// Delivered; removed by retention once past the horizon.
    Synced,
}

impl RecordState {
    /// Classifies a record from its envelope fields.
    pub fn of(synced: bool, retry_count: u32, max_retry: u32) -> Self {
        if synced {
            RecordState::Synced
        } else if retry_count >= max_retry {
            RecordState::Dead
        } else {
            RecordState::Pending
        }
    }

    /// Returns the string representation used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Dead => "dead",
            RecordState::Synced => "synced",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
