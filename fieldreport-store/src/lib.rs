//! SQLite storage layer for the FieldReport engine.
//!
//! Holds the two disjoint record collections (Pending and Synced) and the
//! last-sync marker. The store is an explicit object constructed with a
//! file path or in memory; nothing here is a process-wide singleton, so
//! tests run against `RecordStore::open_in_memory()`.
//!
//! # Architecture
//!
//! - Records are stored as JSON blobs in per-record keyed rows
//! - Promotion writes the synced row before deleting the pending row
//! - Unreadable rows are skipped with a warning, never a crash

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::RecordStore;
