// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background synchronization for the offline action queue.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  offline/fail  ┌─────────────┐
//! │   Producer   │───────────────►│ QueueStore  │◄──────────┐
//! │  (Recorder)  │                └─────────────┘           │
//! └──────────────┘                       ▲                  │
//!        │ online                        │ drain            │ sweep
//!        ▼                        ┌─────────────┐   ┌───────────────┐
//! ┌──────────────┐◄───────────────│ SyncEngine  │   │ RetentionJob  │
//! │  RemoteApi   │                └─────────────┘   └───────────────┘
//! │   (trait)    │                       ▲                  ▲
//! └──────────────┘              ┌─────────────────────────────────┐
//!                               │ BackgroundTasks (30s / 24h)     │
//!                               │   + ConnectivityMonitor edges   │
//!                               └─────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - Per-instance re-entrancy guard on drains
//! - Retry budget with queryable dead-letter state
//! - Idempotency token (the record id) on every event delivery
//! - Events referencing an offline session wait for that session to sync
//! - Injectable remote trait for testing

mod connectivity;
mod engine;
mod error;
mod http;
mod recorder;
mod remote;
mod retention;
mod scheduler;
mod settings;

pub use connectivity::{ConnectivityMonitor, StatusChange, Subscription};
pub use engine::{DrainOutcome, EngineState, SyncEngine, SyncReport};
pub use error::{SyncError, SyncResult};
pub use http::HttpRemote;
pub use recorder::{ActionRecorder, EventOutcome, SessionOutcome};
pub use remote::{
    EventDelivery, RemoteApi, RemoteError, RemoteFuture, RemoteResult, RemoteSession, SessionStart,
};
pub use retention::{RetentionJob, RetentionReport};
pub use scheduler::{BackgroundTasks, Intervals, SyncTrigger};
pub use settings::{
    ConnectivitySettings, RemoteSettings, RetentionSettings, Settings, SyncSettings,
};

#[cfg(test)]
mod test_helpers;
