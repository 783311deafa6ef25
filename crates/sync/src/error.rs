// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::remote::RemoteError;

/// Error type for sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local queue failure. Fatal for the operation that hit it.
    #[error("queue error: {0}")]
    Queue(#[from] tb_core::Error),

    /// Remote call failure that could not be recovered by queueing.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid or unreadable settings.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
