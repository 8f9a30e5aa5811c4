//! In-memory lock store
//!
//! Rows are keyed by `locked_object`, so the per-key entry lock of the map
//! gives the atomic insert-if-absent the protocol needs. Useful for tests and
//! for coordinating tasks inside one process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::model::{InsertOutcome, LockRecord, StorageMode};
use crate::traits::LockStore;

#[derive(Debug, Default)]
pub struct MemoryLockStore {
    locks: DashMap<String, LockRecord>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, live or expired
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn object_of(&self, id: Uuid) -> Option<String> {
        self.locks
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.key().clone())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> anyhow::Result<InsertOutcome> {
        match self.locks.entry(record.locked_object.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_live_at(now) {
                    return Ok(InsertOutcome::Conflict);
                }
                tracing::debug!(
                    locked_object = %record.locked_object,
                    superseded = %entry.get().id,
                    "Superseding expired lock row"
                );
                entry.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn find_by_object(&self, locked_object: &str) -> anyhow::Result<Option<LockRecord>> {
        Ok(self.locks.get(locked_object).map(|r| r.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<LockRecord>> {
        Ok(self
            .locks
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone()))
    }

    async fn update_if_exists(&self, record: &LockRecord) -> anyhow::Result<bool> {
        let Some(key) = self.object_of(record.id) else {
            return Ok(false);
        };

        // The row may have been superseded between the scan and this lookup
        match self.locks.get_mut(&key) {
            Some(mut current) if current.id == record.id => {
                current.renewed_on = record.renewed_on;
                current.expires_on = record.expires_on;
                current.max_age = record.max_age;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let Some(key) = self.object_of(id) else {
            return Ok(false);
        };
        Ok(self.locks.remove_if(&key, |_, r| r.id == id).is_some())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<LockRecord>> {
        let mut expired: Vec<LockRecord> = self
            .locks
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.value().clone())
            .collect();
        expired.sort_by_key(|r| r.created_on);
        Ok(expired)
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        implicit_cutoff: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64> {
        let mut deleted = 0u64;
        self.locks.retain(|_, r| {
            let implicit = match implicit_cutoff {
                Some(cutoff) => r.max_age.is_none() && r.renewed_on <= cutoff,
                None => false,
            };
            let reclaim = r.is_expired_at(now) || implicit;
            if reclaim {
                deleted += 1;
            }
            !reclaim
        });
        Ok(deleted)
    }

    async fn find_all(&self) -> anyhow::Result<Vec<LockRecord>> {
        let mut all: Vec<LockRecord> = self.locks.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|r| r.created_on);
        Ok(all)
    }
}
