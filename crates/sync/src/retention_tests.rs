// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::test_helpers::*;
use tb_core::{EventPayload, SessionPayload, DEFAULT_MAX_RETRY};
use yare::parameterized;

#[test]
fn sweeps_old_synced_records_from_both_collections() {
    let (queue, clock) = clocked_queue();
    let event = queue.enqueue(&tap(1)).unwrap();
    let local = queue.enqueue(&session()).unwrap();
    queue.mark_synced(Collection::Events, &event).unwrap();
    queue.mark_session_synced(&local, "srv-1").unwrap();

    clock.advance(Duration::days(31));
    let report = RetentionJob::new(Arc::clone(&queue)).run();

    assert_eq!(
        report,
        RetentionReport { events_deleted: 1, sessions_deleted: 1, errors: 0 }
    );
    assert!(queue.get::<EventPayload>(&event).unwrap().is_none());
    assert!(queue.get::<SessionPayload>(&local).unwrap().is_none());
}

#[parameterized(
    one_day = { 1 },
    day_before_horizon = { 29 },
)]
fn keeps_recent_synced_records(age_days: i64) {
    let (queue, clock) = clocked_queue();
    let event = queue.enqueue(&tap(1)).unwrap();
    queue.mark_synced(Collection::Events, &event).unwrap();

    clock.advance(Duration::days(age_days));
    let report = RetentionJob::new(Arc::clone(&queue)).run();

    assert_eq!(report.total_deleted(), 0);
    assert!(queue.get::<EventPayload>(&event).unwrap().is_some());
}

#[test]
fn never_touches_unsynced_or_dead_records() {
    let (queue, clock) = clocked_queue();
    let pending = queue.enqueue(&tap(1)).unwrap();
    let dead = queue.enqueue(&tap(2)).unwrap();
    for _ in 0..DEFAULT_MAX_RETRY {
        queue.increment_retry(Collection::Events, &dead).unwrap();
    }

    clock.advance(Duration::days(400));
    let report = RetentionJob::new(Arc::clone(&queue)).run();

    assert_eq!(report.total_deleted(), 0);
    assert!(queue.get::<EventPayload>(&pending).unwrap().is_some());
    assert!(queue.get::<EventPayload>(&dead).unwrap().is_some());
}

#[test]
fn session_mapping_survives_sweep() {
    let (queue, clock) = clocked_queue();
    let local = queue.enqueue(&session()).unwrap();
    queue.mark_session_synced(&local, "srv-7").unwrap();

    clock.advance(Duration::days(45));
    RetentionJob::new(Arc::clone(&queue)).run();

    assert_eq!(queue.resolve_session(&local).unwrap().as_deref(), Some("srv-7"));
}

#[test]
fn custom_horizon() {
    let (queue, clock) = clocked_queue();
    let event = queue.enqueue(&tap(1)).unwrap();
    queue.mark_synced(Collection::Events, &event).unwrap();

    clock.advance(Duration::hours(2));
    let job = RetentionJob::new(Arc::clone(&queue)).with_horizon(Duration::hours(1));
    assert_eq!(job.horizon(), Duration::hours(1));

    assert_eq!(job.run().events_deleted, 1);
}
