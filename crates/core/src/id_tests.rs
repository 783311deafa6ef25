// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use std::collections::HashSet;
use yare::parameterized;

#[test]
fn test_generate_record_id_format() {
    let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
    let id = generate_record_id("ev", &now);
    assert!(id.starts_with(&format!("ev-{}-", now.timestamp_millis())));
    assert!(is_record_id(&id, "ev"));
}

#[test]
fn test_same_instant_ids_differ() {
    let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
    let ids: HashSet<String> = (0..500).map(|_| generate_record_id("ss", &now)).collect();
    assert_eq!(ids.len(), 500);
}

#[parameterized(
    empty = { "" },
    no_hash = { "ev-1700000000000" },
    short_hash = { "ev-1700000000000-abc" },
    upper_prefix = { "EV-1700000000000-0badf00d" },
    other_prefix = { "ss-1700000000000-0badf00d" },
    bad_millis = { "ev-soon-0badf00d" },
    non_hex = { "ev-1700000000000-zzzzzzzz" },
)]
fn test_is_record_id_rejects(id: &str) {
    assert!(!is_record_id(id, "ev"));
}

#[test]
fn test_is_record_id_accepts() {
    assert!(is_record_id("ev-1700000000000-0badf00d", "ev"));
}
