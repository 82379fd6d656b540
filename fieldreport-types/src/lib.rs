//! Core type definitions for the FieldReport offline-first engine.
//!
//! This crate defines the types shared between the local record store and
//! the sync engine:
//! - Provisional and canonical identifiers, and the tagged record identity
//! - The occurrence record, payload and patch models
//!
//! Transport- and storage-specific types (wire formats, SQL schemas)
//! belong in their respective crates, not here.

mod ids;
mod record;

pub use ids::{LocalId, RecordId, RemoteId};
pub use record::{GeoPoint, OccurrencePatch, OccurrencePayload, OccurrenceRecord, SyncStatus};
