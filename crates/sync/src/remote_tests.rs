// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::{TimeZone, Utc};
use tb_core::SessionRef;

fn bulk_event() -> EventPayload {
    EventPayload {
        session: SessionRef::Remote("srv-7".into()),
        goal_id: Some("goal-1".into()),
        category: "salah".into(),
        item_id: "fajr".into(),
        kind: EventKind::Bulk,
        delta: -2,
        value_after: 11,
        prayer_segment: Some("fajr".into()),
        captured_at: Utc.with_ymd_and_hms(2026, 4, 2, 4, 55, 0).unwrap(),
        timezone: "Europe/Istanbul".into(),
    }
}

#[test]
fn event_delivery_carries_token_and_delta() {
    let delivery = EventDelivery::new("ev-1-abcd1234", "srv-7".into(), &bulk_event());
    assert_eq!(delivery.idempotency_token, "ev-1-abcd1234");
    assert_eq!(delivery.session_id, "srv-7");
    assert_eq!(delivery.delta, -2);
    assert_eq!(delivery.event_type, EventKind::Bulk);
    assert_eq!(delivery.prayer_segment.as_deref(), Some("fajr"));
}

#[test]
fn event_delivery_wire_format() {
    let mut payload = bulk_event();
    payload.prayer_segment = None;
    let delivery = EventDelivery::new("tok", "srv-7".into(), &payload);
    let json = serde_json::to_value(&delivery).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "session_id": "srv-7",
            "delta": -2,
            "event_type": "bulk",
            "idempotency_token": "tok",
        })
    );
}

#[test]
fn session_start_from_payload() {
    let mut payload = tb_core::SessionPayload::started(Some("goal-3".into()), Utc::now());
    payload.category = Some("dhikr".into());
    let start = SessionStart::from(&payload);
    assert_eq!(start.goal_id.as_deref(), Some("goal-3"));
    assert_eq!(start.category.as_deref(), Some("dhikr"));
    assert!(start.prayer_segment.is_none());
}

#[test]
fn remote_session_decodes() {
    let session: RemoteSession = serde_json::from_str(r#"{"session_id":"srv-99"}"#).unwrap();
    assert_eq!(session.session_id, "srv-99");
}

#[test]
fn rejected_error_mentions_status() {
    let err = RemoteError::Rejected { status: 409, body: "conflict".into() };
    assert!(err.to_string().contains("409"));
}
