// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    queue = { SyncError::Queue(tb_core::Error::LockPoisoned), "queue error" },
    remote = { SyncError::Remote(RemoteError::Timeout), "remote error" },
    config = { SyncError::Config("missing base_url".into()), "missing base_url" },
)]
fn sync_error_display(err: SyncError, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn sync_error_from_core() {
    let err: SyncError = tb_core::Error::DuplicateRecord("ev-1".into()).into();
    assert!(matches!(err, SyncError::Queue(tb_core::Error::DuplicateRecord(_))));
}
