//! Domain model types for lock persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Process-local map, for tests and single-process use
    Memory,
    /// External relational database (MySQL/PostgreSQL/SQLite)
    ExternalDb,
}

/// Result of an atomic insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written (possibly superseding an expired row)
    Inserted,
    /// A live row for the same `locked_object` already exists
    Conflict,
}

/// One row of the lock table.
///
/// A row is either a held lease or an expired lease waiting to be reclaimed.
/// `expires_on == None` means the lease never expires on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub id: Uuid,
    pub locked_object: String,
    pub created_on: DateTime<Utc>,
    pub renewed_on: DateTime<Utc>,
    pub expires_on: Option<DateTime<Utc>>,
    /// Lease length in seconds
    pub max_age: Option<u64>,
}

impl LockRecord {
    /// Check whether the lease has lapsed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_on {
            Some(expires_on) => expires_on <= now,
            None => false,
        }
    }

    /// Check whether the lease is held at `now`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
    }
}
