//! Error types and Result alias for bluestream.
//!
//! Errors are grouped by where they surface:
//!
//! - `Config`: construction-time failures, nothing to clean up
//! - `InvalidVersion` / `InvalidState`: version-filter failures, reported
//!   alongside the message as a rejected-with-error verdict
//! - `Admin` / `Alignment`: offset-alignment failures returned from `poll`;
//!   the wrapper stays uninitialized and the next `poll` retries
//! - `Read` / `Commit` / `Timeout`: pass-through of the live consumer path
//!
//! The crate never retries internally; callers decide.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for bluestream operations
pub type Result<T> = std::result::Result<T, BlueGreenError>;

/// Boxed source error from a collaborator (admin client, native consumer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for bluestream
#[derive(Error, Debug)]
pub enum BlueGreenError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid version token: {0:?}")]
    InvalidVersion(String),

    #[error("invalid blue/green state: {0}")]
    InvalidState(String),

    #[error("{operation}: {source}")]
    Admin {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to align offsets for group {group}: {reason}")]
    Alignment { group: String, reason: String },

    #[error("read error: {0}")]
    Read(#[source] BoxError),

    #[error("commit error: {0}")]
    Commit(#[source] BoxError),

    #[error("poll timed out after {0:?}")]
    Timeout(Duration),

    #[error("consumer is closed")]
    Closed,
}

impl BlueGreenError {
    /// Wrap a collaborator error with the admin operation that failed.
    pub fn admin(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Admin {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn alignment(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Alignment {
            group: group.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}
