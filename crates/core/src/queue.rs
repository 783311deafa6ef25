// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable queue.
//!
//! The [`QueueStore`] holds the two append-only collections (queued events
//! and queued sessions) plus the mapping from local session ids to the ids
//! the remote service issued for them. Every operation runs in its own
//! transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Rows};

use crate::clock::{ClockSource, SystemClock};
use crate::error::{Error, Result};
use crate::id::{generate_record_id, is_record_id};
use crate::record::{Collection, QueuePayload, QueueRecord, RecordState};

/// SQL schema for the offline queue.
pub const SCHEMA: &str = r#"
-- Queued counter events
CREATE TABLE IF NOT EXISTS queued_events (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    retry_count INTEGER NOT NULL DEFAULT 0
);

-- Queued practice sessions
CREATE TABLE IF NOT EXISTS queued_sessions (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    retry_count INTEGER NOT NULL DEFAULT 0
);

-- Local session id -> server-issued session id
CREATE TABLE IF NOT EXISTS session_ids (
    local_id TEXT PRIMARY KEY,
    remote_id TEXT NOT NULL,
    synced_at TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_events_unsynced ON queued_events(created_at) WHERE synced = 0;
CREATE INDEX IF NOT EXISTS idx_sessions_unsynced ON queued_sessions(created_at) WHERE synced = 0;
CREATE INDEX IF NOT EXISTS idx_events_synced ON queued_events(created_at) WHERE synced = 1;
CREATE INDEX IF NOT EXISTS idx_sessions_synced ON queued_sessions(created_at) WHERE synced = 1;
"#;

/// Apply the schema to a connection. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Format a timestamp for storage.
///
/// Fixed-width UTC so that text comparison in SQL matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse a JSON payload column.
fn parse_payload<P: QueuePayload>(value: &str) -> std::result::Result<P, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid {} payload: {e}",
                P::COLLECTION
            ))),
        )
    })
}

/// Map a `SELECT id, payload, created_at, synced, retry_count` row.
fn record_from_row<P: QueuePayload>(
    row: &Row<'_>,
) -> std::result::Result<QueueRecord<P>, rusqlite::Error> {
    let payload_str: String = row.get(1)?;
    let created_str: String = row.get(2)?;
    let retry_count: i64 = row.get(4)?;
    Ok(QueueRecord {
        id: row.get(0)?,
        payload: parse_payload(&payload_str)?,
        created_at: parse_timestamp(&created_str, "created_at")?,
        synced: row.get(3)?,
        retry_count: to_retry_count(retry_count),
    })
}

fn to_retry_count(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Decode rows one at a time so a bad row cannot hide the rest.
fn scan_rows<P: QueuePayload>(mut rows: Rows<'_>) -> Result<UnsyncedScan<P>> {
    let mut scan = UnsyncedScan { records: Vec::new(), undecodable: Vec::new() };
    while let Some(row) = rows.next()? {
        match record_from_row::<P>(row) {
            Ok(record) => scan.records.push(record),
            Err(e) => {
                let retry_count: i64 = row.get(4)?;
                scan.undecodable.push(UndecodableRecord {
                    id: row.get(0)?,
                    retry_count: to_retry_count(retry_count),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(scan)
}

fn warn_undecodable(collection: Collection, rows: &[UndecodableRecord]) {
    for row in rows {
        tracing::warn!(%collection, id = %row.id, "skipping undecodable record: {}", row.reason);
    }
}

/// Convert a row count to `usize`.
fn to_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

/// An unsynced row whose payload or timestamp no longer decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableRecord {
    pub id: String,
    pub retry_count: u32,
    pub reason: String,
}

/// Unsynced rows of one collection, split by whether they decode.
#[derive(Debug)]
pub struct UnsyncedScan<P> {
    pub records: Vec<QueueRecord<P>>,
    pub undecodable: Vec<UndecodableRecord>,
}

/// Per-state record counts for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Unsynced and still retryable.
    pub pending: usize,
    /// Unsynced with the retry budget exhausted.
    pub dead: usize,
    /// Delivered and awaiting retention.
    pub synced: usize,
}

impl QueueStats {
    /// Count for a single state.
    pub fn get(&self, state: RecordState) -> usize {
        match state {
            RecordState::Pending => self.pending,
            RecordState::Dead => self.dead,
            RecordState::Synced => self.synced,
        }
    }

    /// Total records in the collection.
    pub fn total(&self) -> usize {
        self.pending + self.dead + self.synced
    }
}

/// Durable queue of offline actions.
pub struct QueueStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn ClockSource>,
}

impl QueueStore {
    /// Open the queue at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open the queue at the given path with a custom clock.
    pub fn open_with_clock(path: &Path, clock: Arc<dyn ClockSource>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;

        tracing::debug!("opened queue at {}", path.display());
        Ok(QueueStore { conn: Mutex::new(conn), clock })
    }

    /// Open an in-memory queue (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_clock(Arc::new(SystemClock))
    }

    /// Open an in-memory queue with a custom clock (for testing).
    pub fn open_in_memory_with_clock(clock: Arc<dyn ClockSource>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(QueueStore { conn: Mutex::new(conn), clock })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Generate a fresh record id for a collection.
    pub fn new_id(&self, collection: Collection) -> String {
        generate_record_id(collection.id_prefix(), &self.clock.now())
    }

    /// Enqueue a payload, returning the generated record id.
    ///
    /// The record starts unsynced with a retry count of zero.
    pub fn enqueue<P: QueuePayload>(&self, payload: &P) -> Result<String> {
        let id = self.new_id(P::COLLECTION);
        self.enqueue_with_id(&id, payload)?;
        Ok(id)
    }

    /// Enqueue a payload under a caller-chosen id.
    ///
    /// Used when an id was already presented to the remote side as an
    /// idempotency token. The id must come from [`QueueStore::new_id`] for
    /// the same collection. Fails with [`Error::DuplicateRecord`] if the id
    /// is taken.
    pub fn enqueue_with_id<P: QueuePayload>(&self, id: &str, payload: &P) -> Result<()> {
        let prefix = P::COLLECTION.id_prefix();
        if !is_record_id(id, prefix) {
            return Err(Error::InvalidRecordId {
                id: id.to_string(),
                collection: P::COLLECTION,
                prefix,
            });
        }
        let json = serde_json::to_string(payload)?;
        let created_at = format_timestamp(&self.clock.now());
        let table = P::COLLECTION.table();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
            &format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(Error::DuplicateRecord(id.to_string()));
        }
        tx.execute(
            &format!(
                "INSERT INTO {table} (id, payload, created_at, synced, retry_count)
                 VALUES (?1, ?2, ?3, 0, 0)"
            ),
            params![id, json, created_at],
        )?;
        tx.commit()?;

        tracing::debug!(collection = %P::COLLECTION, id, "enqueued");
        Ok(())
    }

    /// Get a record by id.
    pub fn get<P: QueuePayload>(&self, id: &str) -> Result<Option<QueueRecord<P>>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT id, payload, created_at, synced, retry_count
                     FROM {} WHERE id = ?1",
                    P::COLLECTION.table()
                ),
                params![id],
                record_from_row::<P>,
            )
            .optional()?;
        Ok(record)
    }

    /// List every unsynced record in the payload's collection.
    ///
    /// Dead records are included; callers filter by retry count. Results come
    /// back oldest first, but the sync engine treats them as a working set.
    /// Rows that fail to decode are logged and left out.
    pub fn list_unsynced<P: QueuePayload>(&self) -> Result<Vec<QueueRecord<P>>> {
        let scan = self.scan_unsynced::<P>()?;
        warn_undecodable(P::COLLECTION, &scan.undecodable);
        Ok(scan.records)
    }

    /// Read every unsynced row, keeping rows that fail to decode apart from
    /// the good ones.
    pub fn scan_unsynced<P: QueuePayload>(&self) -> Result<UnsyncedScan<P>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, payload, created_at, synced, retry_count
             FROM {} WHERE synced = 0 ORDER BY created_at, id",
            P::COLLECTION.table()
        ))?;
        let rows = stmt.query([])?;
        scan_rows(rows)
    }

    /// List unsynced records whose retry budget is exhausted.
    ///
    /// Rows that fail to decode are logged and left out.
    pub fn list_dead<P: QueuePayload>(&self, max_retry: u32) -> Result<Vec<QueueRecord<P>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, payload, created_at, synced, retry_count
             FROM {} WHERE synced = 0 AND retry_count >= ?1 ORDER BY created_at, id",
            P::COLLECTION.table()
        ))?;
        let rows = stmt.query(params![max_retry])?;
        let scan = scan_rows::<P>(rows)?;
        warn_undecodable(P::COLLECTION, &scan.undecodable);
        Ok(scan.records)
    }

    /// Sync state of a record, read without decoding its payload.
    pub fn state_of(
        &self,
        collection: Collection,
        id: &str,
        max_retry: u32,
    ) -> Result<Option<RecordState>> {
        let conn = self.lock()?;
        let flags: Option<(bool, i64)> = conn
            .query_row(
                &format!(
                    "SELECT synced, retry_count FROM {} WHERE id = ?1",
                    collection.table()
                ),
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(flags.map(|(synced, retry_count)| {
            RecordState::of(synced, to_retry_count(retry_count), max_retry)
        }))
    }

    /// Mark a record as synced.
    ///
    /// Returns false if the id is absent (already cleaned up).
    pub fn mark_synced(&self, collection: Collection, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let affected = conn.execute(
            &format!("UPDATE {} SET synced = 1 WHERE id = ?1", collection.table()),
            params![id],
        )?;
        Ok(affected > 0)
    }

    /// Mark a queued session synced and remember the id the server issued.
    ///
    /// Both writes happen in one transaction. Returns false (and records no
    /// mapping) if the session is absent.
    pub fn mark_session_synced(&self, local_id: &str, remote_id: &str) -> Result<bool> {
        let synced_at = format_timestamp(&self.clock.now());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let affected = tx.execute(
            &format!(
                "UPDATE {} SET synced = 1 WHERE id = ?1",
                Collection::Sessions.table()
            ),
            params![local_id],
        )?;
        if affected == 0 {
            return Ok(false);
        }
        tx.execute(
            "INSERT OR REPLACE INTO session_ids (local_id, remote_id, synced_at)
             VALUES (?1, ?2, ?3)",
            params![local_id, remote_id, synced_at],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Look up the server-issued id for a locally created session.
    pub fn resolve_session(&self, local_id: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let remote_id = conn
            .query_row(
                "SELECT remote_id FROM session_ids WHERE local_id = ?1",
                params![local_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(remote_id)
    }

    /// Record one more failed delivery attempt.
    ///
    /// Returns false if the id is absent.
    pub fn increment_retry(&self, collection: Collection, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let affected = conn.execute(
            &format!(
                "UPDATE {} SET retry_count = retry_count + 1 WHERE id = ?1",
                collection.table()
            ),
            params![id],
        )?;
        Ok(affected > 0)
    }

    /// Delete synced records created before `now - horizon`.
    ///
    /// Unsynced records are never touched, whatever their age.
    pub fn delete_if_stale_and_synced(
        &self,
        collection: Collection,
        horizon: Duration,
    ) -> Result<usize> {
        let Some(cutoff) = self.clock.now().checked_sub_signed(horizon) else {
            tracing::debug!(%collection, "retention horizon reaches past the earliest date");
            return Ok(0);
        };
        let cutoff = format_timestamp(&cutoff);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE synced = 1 AND created_at < ?1",
                collection.table()
            ),
            params![cutoff],
        )?;
        tx.commit()?;

        if deleted > 0 {
            tracing::debug!(%collection, deleted, "deleted stale synced records");
        }
        Ok(deleted)
    }

    /// Count records with the given synced flag.
    pub fn count_by_state(&self, collection: Collection, synced: bool) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE synced = ?1", collection.table()),
            params![synced],
            |row| row.get(0),
        )?;
        Ok(to_count(count))
    }

    /// Count records per [`RecordState`].
    pub fn stats(&self, collection: Collection, max_retry: u32) -> Result<QueueStats> {
        let conn = self.lock()?;
        let (pending, dead, synced): (i64, i64, i64) = conn.query_row(
            &format!(
                "SELECT
                    COALESCE(SUM(CASE WHEN synced = 0 AND retry_count < ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN synced = 0 AND retry_count >= ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN synced = 1 THEN 1 ELSE 0 END), 0)
                 FROM {}",
                collection.table()
            ),
            params![max_retry],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(QueueStats {
            pending: to_count(pending),
            dead: to_count(dead),
            synced: to_count(synced),
        })
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
