//! Error types for the sync layer.

use crate::remote::RemoteError;
use fieldreport_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engine.
///
/// The fallback-vs-surface decisions in `create`/`update`/`delete` are
/// explicit branches on these variants, not artifacts of broad catches.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No connectivity; the operation was aborted before any remote attempt.
    #[error("device is offline")]
    Offline,

    /// Network failure, timeout, or 5xx from the backend. Triggers
    /// local-fallback-and-retry semantics where the operation allows it.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend rejected the request (4xx / validation). Never queued
    /// for blind retry, since resubmission would fail identically.
    #[error("rejected by backend ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The operation referenced an id absent from the expected collection.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The local record store failed.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// A blocking store task could not be joined.
    #[error("store task failed: {0}")]
    Task(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SyncError::NotFound(id),
            other => SyncError::Store(other),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(msg) => SyncError::Transport(msg),
            RemoteError::Rejected { status, message } => SyncError::Rejected { status, message },
        }
    }
}
