//! Sync orchestrator.
//!
//! Gates every remote-touching operation on the connectivity probe,
//! reconciles the pending collection with the backend one record at a
//! time, and keeps the identity tag and sync status in agreement through
//! every transition. The store is the only shared mutable resource and is
//! only ever touched through this engine.

use crate::error::{SyncError, SyncResult};
use crate::probe::ConnectivityProbe;
use crate::remote::{RemoteClient, RemoteError};
use chrono::{DateTime, Utc};
use fieldreport_store::{RecordStore, StoreError};
use fieldreport_types::{LocalId, OccurrencePatch, OccurrencePayload, OccurrenceRecord, RecordId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Classification of a per-record sync failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network failure, timeout, or 5xx; worth retrying on a later cycle.
    Transport,
    /// Backend validation rejection; retrying the same payload is futile.
    Rejected,
    /// The local store failed while promoting.
    Store,
}

/// Why one record failed during a sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// Provisional id of the record that failed.
    pub local_id: LocalId,
    pub kind: FailureKind,
    pub reason: String,
}

/// Aggregate outcome of one sync cycle. Ephemeral; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncCycleResult {
    /// Records promoted to synced during this cycle.
    pub succeeded: usize,
    /// Records that stayed pending.
    pub failed: usize,
    /// Per-record reasons for everything counted in `failed`.
    pub failures: Vec<RecordFailure>,
}

/// The reconciliation engine over the local store and the remote backend.
pub struct SyncEngine {
    store: Arc<RecordStore>,
    remote: Arc<dyn RemoteClient>,
    probe: Arc<dyn ConnectivityProbe>,
    /// In-flight guard: a second `sync()` call awaits the running cycle
    /// instead of racing over the same pending snapshot.
    sync_lock: Mutex<()>,
}

impl SyncEngine {
    /// Creates an engine over the given store, backend client and probe.
    pub fn new(
        store: Arc<RecordStore>,
        remote: Arc<dyn RemoteClient>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            store,
            remote,
            probe,
            sync_lock: Mutex::new(()),
        }
    }

    /// Creates an occurrence.
    ///
    /// Online, the backend is tried first; a transport failure falls back
    /// to the local pending queue, so creation only ever fails for a
    /// backend rejection (resubmitting an invalid payload would fail
    /// identically, so it is surfaced instead of queued). Offline, the
    /// record is queued directly.
    pub async fn create(&self, payload: OccurrencePayload) -> SyncResult<OccurrenceRecord> {
        if self.probe.probe().await {
            match self.remote.create(&payload).await {
                Ok(remote) => {
                    let record = remote.into_record();
                    let stored = record.clone();
                    self.with_store(move |s| s.upsert_synced(&stored)).await?;
                    debug!(id = %record.id, "created occurrence online");
                    return Ok(record);
                }
                Err(RemoteError::Transport(reason)) => {
                    warn!("create failed in transit, queueing locally: {reason}");
                }
                Err(rejected @ RemoteError::Rejected { .. }) => {
                    return Err(rejected.into());
                }
            }
        }

        let record = self
            .with_store(move |s| s.append_pending(payload))
            .await?;
        debug!(local_id = %record.local_id, "queued occurrence as pending");
        Ok(record)
    }

    /// Runs one reconciliation cycle over the pending snapshot.
    ///
    /// Fails wholesale only when offline (before any store mutation) or
    /// when the pending snapshot itself cannot be read. Individual record
    /// failures never abort the cycle; they are folded into the result.
    /// The last-sync marker is written after every cycle regardless of
    /// outcome — it records the last *attempt*, not the last full success.
    pub async fn sync(&self) -> SyncResult<SyncCycleResult> {
        let _cycle = self.sync_lock.lock().await;

        if !self.probe.probe().await {
            return Err(SyncError::Offline);
        }

        let snapshot = self.with_store(|s| s.list_pending()).await?;
        info!(pending = snapshot.len(), "starting sync cycle");

        let mut result = SyncCycleResult::default();
        for record in snapshot {
            let local_id = record.local_id;
            match self.remote.create(&record.payload).await {
                Ok(remote) => {
                    let promoted = record.into_promoted(remote.id);
                    let outcome = self
                        .with_store(move |s| s.promote(&local_id, &promoted))
                        .await;
                    match outcome {
                        Ok(()) => {
                            debug!(%local_id, "promoted record to synced");
                            result.succeeded += 1;
                        }
                        Err(e) => {
                            warn!(%local_id, "promotion failed: {e}");
                            result.failed += 1;
                            result.failures.push(RecordFailure {
                                local_id,
                                kind: FailureKind::Store,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!(%local_id, "upload failed, record stays pending: {e}");
                    result.failed += 1;
                    result.failures.push(RecordFailure {
                        local_id,
                        kind: match &e {
                            RemoteError::Transport(_) => FailureKind::Transport,
                            RemoteError::Rejected { .. } => FailureKind::Rejected,
                        },
                        reason: e.to_string(),
                    });
                }
            }
        }

        let now = Utc::now();
        self.with_store(move |s| s.record_sync_timestamp(now)).await?;

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "sync cycle finished"
        );
        Ok(result)
    }

    /// Updates an occurrence.
    ///
    /// Pending records are patched locally with no remote call. Canonical
    /// records require connectivity: offline edits of canonical records
    /// are not queued, the call fails with [`SyncError::Offline`].
    pub async fn update(
        &self,
        id: &RecordId,
        patch: OccurrencePatch,
    ) -> SyncResult<OccurrenceRecord> {
        match id {
            RecordId::Local(local_id) => {
                let local_id = *local_id;
                self.with_store(move |s| s.update_local(&local_id, patch))
                    .await
            }
            RecordId::Remote(remote_id) => {
                if !self.probe.probe().await {
                    return Err(SyncError::Offline);
                }
                let remote = self.remote.update(remote_id, &patch).await?;
                let record = remote.into_record();
                let mirrored = record.clone();
                self.with_store(move |s| s.upsert_synced(&mirrored)).await?;
                Ok(record)
            }
        }
    }

    /// Deletes an occurrence.
    ///
    /// Pending records are removed locally and the remote client is never
    /// consulted. For canonical records the remote delete is attempted
    /// when online, but the local copy is removed regardless of its
    /// outcome; offline, only the local copy is removed. Either way the
    /// remote store may now hold a record this device no longer shows.
    pub async fn delete(&self, id: &RecordId) -> SyncResult<()> {
        if let RecordId::Remote(remote_id) = id {
            if self.probe.probe().await {
                if let Err(e) = self.remote.delete(remote_id).await {
                    warn!(%remote_id, "remote delete failed, removing local copy anyway: {e}");
                }
            } else {
                info!(%remote_id, "offline, removing local copy of canonical record only");
            }
        }

        let id = id.clone();
        self.with_store(move |s| s.remove(&id)).await
    }

    /// Fetches one occurrence: from the backend when it is canonical and
    /// the device is online, from the local store otherwise.
    pub async fn get(&self, id: &RecordId) -> SyncResult<Option<OccurrenceRecord>> {
        if let RecordId::Remote(remote_id) = id {
            if self.probe.probe().await {
                match self.remote.get(remote_id).await {
                    Ok(remote) => return Ok(Some(remote.into_record())),
                    Err(e) => {
                        warn!(%remote_id, "remote fetch failed, falling back to local copy: {e}");
                    }
                }
            }
        }

        let id = id.clone();
        self.with_store(move |s| s.get(&id)).await
    }

    // ── Local snapshots ──────────────────────────────────────────

    /// All records, pending first.
    pub async fn records(&self) -> SyncResult<Vec<OccurrenceRecord>> {
        self.with_store(|s| s.list_all()).await
    }

    /// Snapshot of the pending collection.
    pub async fn pending(&self) -> SyncResult<Vec<OccurrenceRecord>> {
        self.with_store(|s| s.list_pending()).await
    }

    /// Snapshot of the synced collection.
    pub async fn synced(&self) -> SyncResult<Vec<OccurrenceRecord>> {
        self.with_store(|s| s.list_synced()).await
    }

    /// Number of records waiting to be uploaded.
    pub async fn pending_count(&self) -> SyncResult<usize> {
        self.with_store(|s| s.pending_count()).await
    }

    /// Number of photo references waiting to be uploaded.
    pub async fn pending_photo_count(&self) -> SyncResult<usize> {
        self.with_store(|s| s.pending_photo_count()).await
    }

    /// When the last sync cycle was attempted, if any.
    pub async fn last_synced_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        self.with_store(|s| s.read_sync_timestamp()).await
    }

    /// Clears all local state. Diagnostics only.
    pub async fn purge_all(&self) -> SyncResult<()> {
        self.with_store(|s| s.purge_all()).await
    }

    // ── Internals ────────────────────────────────────────────────

    /// Runs a blocking store operation on the blocking pool.
    async fn with_store<T, F>(&self, op: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&RecordStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
            .map_err(SyncError::from)
    }
}
