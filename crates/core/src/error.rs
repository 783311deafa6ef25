// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tb-core operations.

use thiserror::Error;

use crate::record::Collection;

/// All possible errors that can occur in queue operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("duplicate record id: {0}")]
    DuplicateRecord(String),

    #[error("queue lock poisoned")]
    LockPoisoned,

    #[error("invalid record id '{id}' for {collection}\n  hint: ids look like {prefix}-<unix_ms>-<8 hex chars>")]
    InvalidRecordId {
        id: String,
        collection: Collection,
        prefix: &'static str,
    },
}

/// A specialized Result type for tb-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
