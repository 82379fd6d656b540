//! The occurrence record model.
//!
//! An occurrence is a field-reported incident. Records start life as
//! Pending with a provisional id, and are promoted to Synced with a
//! canonical id once the backend acknowledges them. The identity tag and
//! the sync status always agree: `Local` implies `Pending`, `Remote`
//! implies `Synced`. The constructors here are the only way to build a
//! record, so that agreement holds by construction.

use crate::{LocalId, RecordId, RemoteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync status of a record. Mirrors the identity tag on [`OccurrenceRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Captured locally, not yet acknowledged by the backend.
    Pending,
    /// Confirmed by the backend under a canonical id.
    Synced,
}

/// A captured location fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, if the capture layer reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// When the fix was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

/// The domain payload of an occurrence.
///
/// Opaque to the sync engine beyond serialization: photos are references
/// produced by the capture layer, the signature is an encoded blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrencePayload {
    /// Incident type.
    pub kind: String,
    /// When the incident occurred.
    pub occurred_at: DateTime<Utc>,
    /// Vehicle involved or dispatched.
    pub vehicle: String,
    /// Responding team.
    pub team: String,
    /// Free-form description.
    pub description: String,
    /// Opaque photo references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Encoded signature blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A partial update to an occurrence payload. `None` fields are left
/// untouched; `photos`, `location`, `signature` and `notes` replace the
/// previous value when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccurrencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OccurrencePatch {
    /// Returns true if the patch carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A field-reported incident, as held by the local record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    /// Tagged identity: provisional while pending, canonical once synced.
    pub id: RecordId,
    /// Sync status, always in agreement with the identity tag.
    pub status: SyncStatus,
    /// Domain payload.
    pub payload: OccurrencePayload,
    /// The provisional id this record was captured under. Retained after
    /// promotion for audit and back-reference.
    pub local_id: LocalId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OccurrenceRecord {
    /// Creates a new pending record with a fresh provisional id.
    #[must_use]
    pub fn pending(payload: OccurrencePayload) -> Self {
        let local_id = LocalId::new();
        let now = Utc::now();
        Self {
            id: RecordId::Local(local_id),
            status: SyncStatus::Pending,
            payload,
            local_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a synced record directly from a backend acknowledgement,
    /// without ever passing through the pending collection. Used when a
    /// create succeeds online on the first attempt.
    #[must_use]
    pub fn synced(remote_id: RemoteId, payload: OccurrencePayload) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::Remote(remote_id),
            status: SyncStatus::Synced,
            payload,
            // No pending copy ever existed, but the provisional id is still
            // minted so audit back-references stay uniform.
            local_id: LocalId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Consumes this pending record and returns its promoted form under
    /// the given canonical id. The provisional id is preserved in
    /// `local_id` and `created_at` is carried over.
    #[must_use]
    pub fn into_promoted(self, remote_id: RemoteId) -> Self {
        Self {
            id: RecordId::Remote(remote_id),
            status: SyncStatus::Synced,
            payload: self.payload,
            local_id: self.local_id,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Applies a patch to the payload and bumps `updated_at`.
    pub fn apply_patch(&mut self, patch: OccurrencePatch) {
        if let Some(kind) = patch.kind {
            self.payload.kind = kind;
        }
        if let Some(occurred_at) = patch.occurred_at {
            self.payload.occurred_at = occurred_at;
        }
        if let Some(vehicle) = patch.vehicle {
            self.payload.vehicle = vehicle;
        }
        if let Some(team) = patch.team {
            self.payload.team = team;
        }
        if let Some(description) = patch.description {
            self.payload.description = description;
        }
        if let Some(photos) = patch.photos {
            self.payload.photos = photos;
        }
        if let Some(location) = patch.location {
            self.payload.location = Some(location);
        }
        if let Some(signature) = patch.signature {
            self.payload.signature = Some(signature);
        }
        if let Some(notes) = patch.notes {
            self.payload.notes = Some(notes);
        }
        self.updated_at = Utc::now();
    }

    /// Returns true if this record is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == SyncStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> OccurrencePayload {
        OccurrencePayload {
            kind: "collision".into(),
            occurred_at: Utc::now(),
            vehicle: "V-12".into(),
            team: "alpha".into(),
            description: "two-vehicle collision, no injuries".into(),
            photos: vec![],
            location: None,
            signature: None,
            notes: None,
        }
    }

    #[test]
    fn pending_record_has_local_identity() {
        let record = OccurrenceRecord::pending(payload());
        assert!(record.id.is_local());
        assert_eq!(record.status, SyncStatus::Pending);
        assert_eq!(record.id.as_local(), Some(&record.local_id));
        assert!(record.updated_at >= record.created_at);
    }

    #[test]
    fn promotion_keeps_local_id_and_payload() {
        let record = OccurrenceRecord::pending(payload());
        let local_id = record.local_id;
        let original_payload = record.payload.clone();
        let created_at = record.created_at;

        let promoted = record.into_promoted(RemoteId::new("abc123"));
        assert!(!promoted.id.is_local());
        assert_eq!(promoted.status, SyncStatus::Synced);
        assert_eq!(promoted.local_id, local_id);
        assert_eq!(promoted.payload, original_payload);
        assert_eq!(promoted.created_at, created_at);
        assert!(promoted.updated_at >= promoted.created_at);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut record = OccurrenceRecord::pending(payload());
        let before = record.payload.clone();
        record.apply_patch(OccurrencePatch {
            description: Some("updated description".into()),
            notes: Some("follow-up scheduled".into()),
            ..Default::default()
        });
        assert_eq!(record.payload.description, "updated description");
        assert_eq!(record.payload.notes.as_deref(), Some("follow-up scheduled"));
        assert_eq!(record.payload.kind, before.kind);
        assert_eq!(record.payload.vehicle, before.vehicle);
    }

    #[test]
    fn empty_patch_detected() {
        assert!(OccurrencePatch::default().is_empty());
        let patch = OccurrencePatch {
            team: Some("bravo".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = OccurrenceRecord::pending(payload());
        let json = serde_json::to_string(&record).unwrap();
        let back: OccurrenceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
