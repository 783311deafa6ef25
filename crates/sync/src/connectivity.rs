// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline signal with transition callbacks.
//!
//! The runtime (the daemon's reachability probe, or a host application)
//! feeds the signal through [`ConnectivityMonitor::set_online`]. Callbacks
//! only fire on edges, and run synchronously on the caller of `set_online`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A transition of the connectivity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// offline -> online
    CameOnline,
    /// online -> offline
    WentOffline,
}

type Callback = Arc<dyn Fn(StatusChange) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Connectivity state visible to producers, the engine, and the scheduler.
///
/// Uses an atomic flag for lock-free reads.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    listeners: Arc<Mutex<Listeners>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        ConnectivityMonitor {
            online: AtomicBool::new(online),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Point-in-time read of the signal.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Update the signal, notifying listeners if it changed.
    ///
    /// Returns the transition, if there was one.
    pub fn set_online(&self, online: bool) -> Option<StatusChange> {
        let was_online = self.online.swap(online, Ordering::AcqRel);
        let change = match (was_online, online) {
            (false, true) => StatusChange::CameOnline,
            (true, false) => StatusChange::WentOffline,
            _ => return None,
        };

        tracing::info!(?change, "connectivity changed");

        // Call outside the lock so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback(change);
        }
        Some(change)
    }

    /// Register a callback for transitions.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or unsubscribed.
    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(StatusChange) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of registered callbacks.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Handle for a registered callback. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the callback.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
