// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue record identifiers.
//!
//! Format: `{prefix}-{wall_ms}-{hash}` where hash is the first 8 hex chars of
//! SHA256(pid + timestamp + sequence). The id doubles as the idempotency token
//! sent to the remote side, so it must never repeat within a process.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a record id for the given collection prefix and capture time.
pub fn generate_record_id(prefix: &str, now: &DateTime<Utc>) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = now.timestamp_nanos_opt().unwrap_or_default();
    let input = format!("{}:{}:{}", std::process::id(), nanos, seq);
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}-{}", prefix, now.timestamp_millis(), short_hash)
}

/// Returns true if `id` has the shape [`generate_record_id`] produces for
/// `prefix`.
pub fn is_record_id(id: &str, prefix: &str) -> bool {
    let mut parts = id.splitn(3, '-');
    let (Some(head), Some(millis), Some(hash)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    head == prefix
        && millis.parse::<i64>().is_ok()
        && hash.len() == 8
        && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
