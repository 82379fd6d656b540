//! Remote client interface for the authoritative backend.
//!
//! The sync engine only ever talks to the backend through this trait, so
//! tests inject their own implementations and the HTTP transport stays in
//! one place ([`crate::http::HttpRemoteClient`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldreport_types::{LocalId, OccurrencePatch, OccurrencePayload, OccurrenceRecord, RecordId, RemoteId, SyncStatus};
use thiserror::Error;

/// Errors from the remote backend, classified by retry semantics.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Network failure, timeout, or 5xx. The payload is fine; retrying
    /// later may succeed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// 4xx / validation rejection. Resubmitting the same payload would
    /// fail identically.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// A canonical record as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    /// Backend-assigned canonical id.
    pub id: RemoteId,
    /// Domain payload as echoed back by the backend.
    pub payload: OccurrencePayload,
    /// The provisional id the backend echoed back, if the create carried one.
    pub local_id: Option<LocalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteRecord {
    /// Converts this backend record into a locally storable synced record.
    #[must_use]
    pub fn into_record(self) -> OccurrenceRecord {
        OccurrenceRecord {
            id: RecordId::Remote(self.id),
            status: SyncStatus::Synced,
            payload: self.payload,
            local_id: self.local_id.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Result of a batch create: per-item acceptance with per-item reasons
/// for the rejects. Partial failure is the expected shape here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Items the backend accepted, with their assigned canonical ids.
    pub accepted: Vec<(LocalId, RemoteId)>,
    /// Items the backend rejected, with the reason given.
    pub rejected: Vec<(LocalId, String)>,
}

/// Interface to the authoritative remote store.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Creates an occurrence; the backend assigns the canonical id.
    async fn create(&self, payload: &OccurrencePayload) -> Result<RemoteRecord, RemoteError>;

    /// Partially updates a canonical occurrence.
    async fn update(
        &self,
        id: &RemoteId,
        patch: &OccurrencePatch,
    ) -> Result<RemoteRecord, RemoteError>;

    /// Deletes a canonical occurrence.
    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError>;

    /// Fetches one occurrence by canonical id.
    async fn get(&self, id: &RemoteId) -> Result<RemoteRecord, RemoteError>;

    /// Lists all occurrences visible to the caller.
    async fn list(&self) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Lists occurrences the backend still marks as pending review.
    async fn list_pending(&self) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Uploads a batch of payloads keyed by their provisional ids.
    async fn batch_create(
        &self,
        items: Vec<(LocalId, OccurrencePayload)>,
    ) -> Result<BatchOutcome, RemoteError>;
}
