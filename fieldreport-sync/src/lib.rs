//! Connectivity-gated sync engine for the FieldReport offline-first core.
//!
//! Field operators record occurrences on a device that is frequently
//! disconnected. This crate reconciles those records with the
//! authoritative backend once connectivity returns.
//!
//! # Components
//!
//! - **Probe**: bounded-time reachability check, the single gate before
//!   every remote-touching operation
//! - **Remote**: the backend client interface and its HTTP implementation
//! - **Engine**: the orchestrator — create/update/delete/sync over the
//!   local record store and the backend
//!
//! # Record lifecycle
//!
//! A record is captured as Pending under a provisional id, uploaded by a
//! sync cycle, and promoted to Synced under its backend-assigned canonical
//! id. Promotion is one-way; failed uploads stay Pending and are retried
//! by the next externally triggered cycle.
//!
//! # Example
//!
//! ```no_run
//! use fieldreport_store::RecordStore;
//! use fieldreport_sync::{ApiConfig, HttpProbe, HttpRemoteClient, SyncEngine};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RecordStore::open(std::path::Path::new("records.db"))?);
//! let remote = Arc::new(HttpRemoteClient::new(ApiConfig::default()));
//! let probe = Arc::new(HttpProbe::default());
//!
//! let engine = SyncEngine::new(store, remote, probe);
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod http;
mod probe;
mod remote;

pub use engine::{FailureKind, RecordFailure, SyncCycleResult, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use http::{ApiConfig, HttpRemoteClient};
pub use probe::{ConnectivityProbe, HttpProbe, ProbeConfig};
pub use remote::{BatchOutcome, RemoteClient, RemoteError, RemoteRecord};
