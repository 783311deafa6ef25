// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tb-core: Durable offline queue for the tasbih tracker.
//!
//! This crate provides the queued payload types, record ids, and the
//! SQLite-backed queue used by both the sync engine and the `tasbihd` daemon.

pub mod clock;
pub mod error;
pub mod id;
pub mod queue;
pub mod record;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use queue::{QueueStats, QueueStore, UndecodableRecord, UnsyncedScan};
pub use record::{
    Collection, EventKind, EventPayload, QueuePayload, QueueRecord, RecordState, SessionPayload,
    SessionRef, DEFAULT_MAX_RETRY, RETENTION_HORIZON_DAYS,
};
