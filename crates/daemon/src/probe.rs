// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TCP reachability probe feeding the connectivity monitor.
//!
//! A probe succeeds if a TCP connection to the remote's host and port opens
//! within the timeout. The result is pushed into the monitor on every tick;
//! the monitor only notifies on edges.

use std::sync::Arc;
use std::time::Duration;

use tb_sync::{ConnectivityMonitor, ConnectivitySettings};
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct ReachabilityProbe {
    host: String,
    port: u16,
    interval: Duration,
    timeout: Duration,
}

impl ReachabilityProbe {
    pub fn new(host: String, port: u16, settings: &ConnectivitySettings) -> Self {
        ReachabilityProbe {
            host,
            port,
            interval: Duration::from_secs(settings.probe_interval_secs),
            timeout: Duration::from_millis(settings.probe_timeout_ms),
        }
    }

    /// Attempt one connection.
    pub async fn check(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("probe {}:{} failed: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                tracing::debug!("probe {}:{} timed out", self.host, self.port);
                false
            }
        }
    }

    /// Probe on every interval tick until cancelled.
    pub async fn run(self, monitor: Arc<ConnectivityMonitor>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let reachable = tokio::select! {
                _ = cancel.cancelled() => break,
                reachable = self.check() => reachable,
            };
            monitor.set_online(reachable);
        }
        tracing::debug!("reachability probe stopped");
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
