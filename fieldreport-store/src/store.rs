//! SQLite-backed store for pending and synced occurrence records.
//!
//! Records are kept in two disjoint tables keyed by their id, plus a small
//! key/value table for the last-sync marker. Rows hold the record as a JSON
//! blob; keying by id keeps every mutation independently atomic and lookups
//! O(1). A single connection mutex serializes all mutations on top of that.
//!
//! Table and key names are part of the on-device format and must never be
//! renamed: existing data has to stay readable across upgrades.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use fieldreport_types::{LocalId, OccurrencePatch, OccurrencePayload, OccurrenceRecord, RecordId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

const LAST_SYNC_KEY: &str = "last_sync_at";

/// Durable local store holding the Pending and Synced collections and the
/// last-sync marker.
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecordStore {
    /// Opens (or creates) a record store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory record store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS pending_records (
                local_id TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS synced_records (
                remote_id TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sync_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Pending collection ───────────────────────────────────────

    /// Appends a new pending record for the given payload and returns it.
    /// Never touches the synced collection.
    pub fn append_pending(&self, payload: OccurrencePayload) -> StoreResult<OccurrenceRecord> {
        let record = OccurrenceRecord::pending(payload);
        let json = serde_json::to_string(&record)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO pending_records (local_id, record) VALUES (?1, ?2)",
            params![record.local_id.to_string(), json],
        )?;
        Ok(record)
    }

    /// Returns a snapshot of the pending collection, ordered by local id
    /// (UUID v7, so capture order).
    pub fn list_pending(&self) -> StoreResult<Vec<OccurrenceRecord>> {
        self.list_table("pending_records", "local_id")
    }

    /// Applies a patch to a pending record in place. Fails with `NotFound`
    /// if the id is not currently pending.
    pub fn update_local(
        &self,
        local_id: &LocalId,
        patch: OccurrencePatch,
    ) -> StoreResult<OccurrenceRecord> {
        let conn = self.conn.lock().unwrap();
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM pending_records WHERE local_id = ?1",
                params![local_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let json = json.ok_or_else(|| StoreError::NotFound(local_id.to_string()))?;
        let mut record: OccurrenceRecord = serde_json::from_str(&json)?;
        record.apply_patch(patch);

        let updated = serde_json::to_string(&record)?;
        conn.execute(
            "UPDATE pending_records SET record = ?1 WHERE local_id = ?2",
            params![updated, local_id.to_string()],
        )?;
        Ok(record)
    }

    // ── Synced collection ────────────────────────────────────────

    /// Returns a snapshot of the synced collection.
    pub fn list_synced(&self) -> StoreResult<Vec<OccurrenceRecord>> {
        self.list_table("synced_records", "remote_id")
    }

    /// Inserts or replaces a synced record. Used when an online create
    /// succeeds on the first attempt (the record never passes through the
    /// pending collection) and when mirroring a remote update locally.
    pub fn upsert_synced(&self, record: &OccurrenceRecord) -> StoreResult<()> {
        let remote_id = record
            .id
            .as_remote()
            .ok_or_else(|| StoreError::InvalidData("synced record must carry a canonical id".into()))?
            .clone();
        let json = serde_json::to_string(record)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO synced_records (remote_id, record) VALUES (?1, ?2)",
            params![remote_id.as_str(), json],
        )?;
        Ok(())
    }

    /// Moves a record from the pending to the synced collection under its
    /// canonical identity. Fails with `NotFound` if the provisional id is
    /// not currently pending.
    ///
    /// The synced row is written before the pending row is deleted. A crash
    /// between the two statements leaves the record duplicated, which a
    /// later idempotent re-sync resolves; it is never lost.
    pub fn promote(&self, local_id: &LocalId, promoted: &OccurrenceRecord) -> StoreResult<()> {
        let remote_id = promoted
            .id
            .as_remote()
            .ok_or_else(|| StoreError::InvalidData("promoted record must carry a canonical id".into()))?
            .clone();
        let json = serde_json::to_string(promoted)?;

        let conn = self.conn.lock().unwrap();
        let exists: Option<String> = conn
            .query_row(
                "SELECT local_id FROM pending_records WHERE local_id = ?1",
                params![local_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(local_id.to_string()));
        }

        // Insert before delete: duplication over loss on a mid-promotion crash.
        conn.execute(
            "INSERT OR REPLACE INTO synced_records (remote_id, record) VALUES (?1, ?2)",
            params![remote_id.as_str(), json],
        )?;
        conn.execute(
            "DELETE FROM pending_records WHERE local_id = ?1",
            params![local_id.to_string()],
        )?;
        Ok(())
    }

    // ── Cross-collection operations ──────────────────────────────

    /// Returns all records: pending first, then synced.
    pub fn list_all(&self) -> StoreResult<Vec<OccurrenceRecord>> {
        let mut records = self.list_pending()?;
        records.extend(self.list_synced()?);
        Ok(records)
    }

    /// Looks up a record by its tagged id in the collection the tag names.
    pub fn get(&self, id: &RecordId) -> StoreResult<Option<OccurrenceRecord>> {
        let (table, key_column, key) = Self::locate(id);
        let conn = self.conn.lock().unwrap();
        let json: Option<String> = conn
            .query_row(
                &format!("SELECT record FROM {table} WHERE {key_column} = ?1"),
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => match serde_json::from_str(&json) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    warn!(id = %id, "skipping unreadable record row: {e}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Removes a record from the collection its id tag names. Fails with
    /// `NotFound` if no such row exists.
    pub fn remove(&self, id: &RecordId) -> StoreResult<()> {
        let (table, key_column, key) = Self::locate(id);
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            &format!("DELETE FROM {table} WHERE {key_column} = ?1"),
            params![key],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    // ── Last-sync marker ─────────────────────────────────────────

    /// Records the time of the latest sync attempt.
    pub fn record_sync_timestamp(&self, now: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
            params![LAST_SYNC_KEY, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Reads the last-sync marker, if any cycle has run yet.
    pub fn read_sync_timestamp(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(ts) => Ok(Some(ts.with_timezone(&Utc))),
                Err(e) => {
                    warn!("unreadable last-sync marker {raw:?}: {e}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    // ── Diagnostics ──────────────────────────────────────────────

    /// Clears both collections and the last-sync marker. Diagnostics only.
    pub fn purge_all(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            DELETE FROM pending_records;
            DELETE FROM synced_records;
            DELETE FROM sync_meta;
            ",
        )?;
        Ok(())
    }

    /// Number of pending records.
    pub fn pending_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM pending_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of photo references across all pending records.
    pub fn pending_photo_count(&self) -> StoreResult<usize> {
        let pending = self.list_pending()?;
        Ok(pending.iter().map(|r| r.payload.photos.len()).sum())
    }

    // ── Internals ────────────────────────────────────────────────

    fn locate(id: &RecordId) -> (&'static str, &'static str, String) {
        match id {
            RecordId::Local(local_id) => ("pending_records", "local_id", local_id.to_string()),
            RecordId::Remote(remote_id) => {
                ("synced_records", "remote_id", remote_id.as_str().to_string())
            }
        }
    }

    fn list_table(&self, table: &str, order_column: &str) -> StoreResult<Vec<OccurrenceRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT record FROM {table} ORDER BY {order_column}"))?;
        let rows = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut records = Vec::new();
        for row in rows {
            let json = row?;
            match serde_json::from_str::<OccurrenceRecord>(&json) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // Unreadable rows degrade to a warning, never a crash.
                    warn!(table, "skipping unreadable record row: {e}");
                }
            }
        }
        Ok(records)
    }
}
