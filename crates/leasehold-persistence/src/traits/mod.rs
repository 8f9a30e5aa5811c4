//! Persistence traits for the lock table
//!
//! `LockStore` is the only contract the lock protocol needs from storage:
//! an atomic insert guarded by the "one live row per object" rule, single-row
//! lookups, a whole-row update keyed by id, and bulk deletion of lapsed rows.
//! Backends: external database (`sql`) and process-local map (`memory`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{InsertOutcome, LockRecord, StorageMode};

/// Durable table of lock records
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Get the storage backend kind
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;

    /// Atomically insert `record`.
    ///
    /// A row for the same `locked_object` that is expired at `now` is
    /// superseded in the same atomic step. A live row yields
    /// `InsertOutcome::Conflict`; exactly one of several concurrent callers
    /// gets `InsertOutcome::Inserted`.
    async fn insert_if_absent(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> anyhow::Result<InsertOutcome>;

    /// Find the row for a locked object, live or expired
    async fn find_by_object(&self, locked_object: &str) -> anyhow::Result<Option<LockRecord>>;

    /// Find a row by lock id
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<LockRecord>>;

    /// Overwrite `renewed_on`, `expires_on` and `max_age` of the row with
    /// `record.id`. Returns `false` if no such row exists.
    async fn update_if_exists(&self, record: &LockRecord) -> anyhow::Result<bool>;

    /// Delete a row by lock id. Returns `false` if no such row exists.
    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool>;

    /// All rows with `expires_on <= now`
    async fn find_expired(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<LockRecord>>;

    /// Delete all rows with `expires_on <= now`. With `implicit_cutoff`, also
    /// delete rows without a `max_age` whose `renewed_on <= implicit_cutoff`.
    /// Returns the number of deleted rows.
    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        implicit_cutoff: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64>;

    /// All rows, ordered by creation time
    async fn find_all(&self) -> anyhow::Result<Vec<LockRecord>>;
}
