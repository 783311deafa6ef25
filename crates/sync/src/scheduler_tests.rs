// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::remote::RemoteApi;
use crate::test_helpers::*;
use tb_core::{Collection, EventPayload, QueueStore};

const SETTLE: Duration = Duration::from_millis(10);

struct Fixture {
    queue: Arc<QueueStore>,
    clock: Arc<tb_core::ManualClock>,
    remote: Arc<MockRemote>,
    monitor: Arc<ConnectivityMonitor>,
    tasks: BackgroundTasks,
}

fn start(online: bool, intervals: Intervals) -> Fixture {
    let (queue, clock) = clocked_queue();
    let remote = MockRemote::new();
    let monitor = Arc::new(ConnectivityMonitor::new(online));
    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&queue),
        Arc::clone(&remote) as Arc<dyn RemoteApi>,
        Arc::clone(&monitor),
    ));
    let retention = RetentionJob::new(Arc::clone(&queue));
    let tasks = BackgroundTasks::start(engine, retention, &monitor, intervals);
    Fixture { queue, clock, remote, monitor, tasks }
}

fn slow_sync() -> Intervals {
    Intervals {
        sync: Duration::from_secs(3600),
        ..Intervals::default()
    }
}

#[test]
fn default_intervals() {
    let intervals = Intervals::default();
    assert_eq!(intervals.sync, Duration::from_secs(30));
    assert_eq!(intervals.retention, Duration::from_secs(86_400));
}

#[tokio::test(start_paused = true)]
async fn interval_drains_while_online() {
    let f = start(true, Intervals::default());
    tokio::time::sleep(SETTLE).await;

    f.queue.enqueue(&tap(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(f.remote.delivered().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(f.remote.delivered().len(), 1);
    assert!(f.queue.list_unsynced::<EventPayload>().unwrap().is_empty());

    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interval_ticks_are_skipped_offline() {
    let f = start(false, Intervals::default());
    f.queue.enqueue(&tap(1)).unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(f.remote.delivered().is_empty());
    assert_eq!(f.queue.count_by_state(Collection::Events, false).unwrap(), 1);

    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn coming_online_triggers_a_drain() {
    let f = start(false, slow_sync());
    f.queue.enqueue(&tap(1)).unwrap();
    tokio::time::sleep(SETTLE).await;

    f.monitor.set_online(true);
    tokio::time::sleep(SETTLE).await;

    assert_eq!(f.remote.delivered().len(), 1);
    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn going_offline_does_not_trigger() {
    let f = start(true, slow_sync());
    tokio::time::sleep(SETTLE).await;

    f.queue.enqueue(&tap(1)).unwrap();
    f.monitor.set_online(false);
    tokio::time::sleep(SETTLE).await;

    assert!(f.remote.delivered().is_empty());
    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_drains() {
    let f = start(true, slow_sync());
    tokio::time::sleep(SETTLE).await;

    f.queue.enqueue(&tap(1)).unwrap();
    f.tasks.trigger().request();
    tokio::time::sleep(SETTLE).await;

    assert_eq!(f.remote.delivered().len(), 1);
    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cancel_sync_leaves_retention_running() {
    let f = start(true, slow_sync());
    tokio::time::sleep(SETTLE).await;

    f.tasks.cancel_sync();
    tokio::time::sleep(SETTLE).await;
    assert!(f.tasks.is_sync_finished());
    assert!(!f.tasks.is_retention_finished());

    f.queue.enqueue(&tap(1)).unwrap();
    f.tasks.trigger().request();
    tokio::time::sleep(Duration::from_secs(7200)).await;
    assert!(f.remote.delivered().is_empty());

    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cancel_retention_leaves_sync_running() {
    let f = start(true, slow_sync());
    tokio::time::sleep(SETTLE).await;

    f.tasks.cancel_retention();
    tokio::time::sleep(SETTLE).await;
    assert!(f.tasks.is_retention_finished());
    assert!(!f.tasks.is_sync_finished());

    f.queue.enqueue(&tap(1)).unwrap();
    f.tasks.trigger().request();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(f.remote.delivered().len(), 1);

    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn retention_sweeps_on_interval() {
    let f = start(
        true,
        Intervals {
            sync: Duration::from_secs(3600),
            retention: Duration::from_secs(600),
        },
    );
    tokio::time::sleep(SETTLE).await;

    let id = f.queue.enqueue(&tap(1)).unwrap();
    f.queue.mark_synced(Collection::Events, &id).unwrap();
    f.clock.advance(chrono::Duration::days(31));

    tokio::time::sleep(Duration::from_secs(601)).await;
    assert!(f.queue.get::<EventPayload>(&id).unwrap().is_none());

    f.tasks.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_tasks_and_unsubscribes() {
    let f = start(true, Intervals::default());
    assert_eq!(f.monitor.listener_count(), 1);

    f.tasks.shutdown().await;
    assert_eq!(f.monitor.listener_count(), 0);

    f.queue.enqueue(&tap(1)).unwrap();
    f.monitor.set_online(false);
    f.monitor.set_online(true);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(f.remote.delivered().is_empty());
}

#[tokio::test]
async fn trigger_requests_coalesce() {
    let trigger = SyncTrigger::new();
    trigger.request();
    trigger.request();

    trigger.requested().await;
    let second = tokio::time::timeout(Duration::from_millis(20), trigger.requested()).await;
    assert!(second.is_err());
}
