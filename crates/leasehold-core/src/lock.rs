//! Lock handle and scoped release
//!
//! A `Lock` is a snapshot of the row written at acquisition (or at the last
//! renewal) bound to the manager that produced it.
//!
//! # Scoped use
//!
//! `Lock::scope` runs a future with the lock and releases it afterwards.
//! `Lock::guard` returns a `LockGuard` that releases on drop. Drop cannot wait
//! for the store, so an unreleased guard spawns the release on the current
//! tokio runtime; outside a runtime it logs a warning and leaves the lease to
//! expire or be reclaimed.

use std::future::Future;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use leasehold_persistence::LockRecord;
use uuid::Uuid;

use crate::error::LockResult;
use crate::manager::LockManager;
use crate::naming::Lockable;

#[derive(Clone, Debug)]
pub struct Lock {
    manager: LockManager,
    record: LockRecord,
}

impl Lock {
    pub(crate) fn new(manager: LockManager, record: LockRecord) -> Self {
        Self { manager, record }
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn locked_object(&self) -> &str {
        &self.record.locked_object
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.record.created_on
    }

    pub fn renewed_on(&self) -> DateTime<Utc> {
        self.record.renewed_on
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.record.expires_on
    }

    pub fn max_age(&self) -> Option<u64> {
        self.record.max_age
    }

    pub fn record(&self) -> &LockRecord {
        &self.record
    }

    pub fn manager(&self) -> &LockManager {
        &self.manager
    }

    /// Whether this snapshot's lease has lapsed
    pub fn is_expired(&self) -> bool {
        self.record.is_expired_at(self.manager.now())
    }

    /// Extend the lease and refresh this snapshot.
    ///
    /// Fails with `RenewalError` when the object has meanwhile been locked
    /// under another id.
    pub async fn renew(&mut self) -> LockResult<()> {
        let renewed = self
            .manager
            .renew_held(self.record.id, Some(&self.record.locked_object))
            .await?;
        self.record = renewed.record;
        Ok(())
    }

    /// Release the lease. See `LockManager::release_lock` for `silent`.
    pub async fn release(&self, silent: bool) -> LockResult<()> {
        self.manager.release_lock(self.record.id, silent).await
    }

    /// Wrap the lock in a guard that releases it on drop
    pub fn guard(self) -> LockGuard {
        LockGuard {
            lock: self,
            released: false,
        }
    }

    /// Run `f` with the lock and release it when `f` completes. If `f` panics
    /// or the returned future is dropped, the guard releases the lock.
    pub async fn scope<F, Fut, T>(self, f: F) -> LockResult<T>
    where
        F: FnOnce(Lock) -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.clone().guard();
        let output = f(self).await;
        guard.release().await?;
        Ok(output)
    }
}

impl Lockable for Lock {
    fn lock_type(&self) -> &str {
        "Lock"
    }

    fn lock_id(&self) -> String {
        self.record.id.to_string()
    }
}

/// RAII guard for a `Lock`
#[derive(Debug)]
pub struct LockGuard {
    lock: Lock,
    released: bool,
}

impl LockGuard {
    /// Release now and disarm the drop path
    pub async fn release(mut self) -> LockResult<()> {
        self.released = true;
        self.lock.release(true).await
    }
}

impl Deref for LockGuard {
    type Target = Lock;

    fn deref(&self) -> &Lock {
        &self.lock
    }
}

impl DerefMut for LockGuard {
    fn deref_mut(&mut self) -> &mut Lock {
        &mut self.lock
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let lock = self.lock.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = lock.release(true).await {
                        tracing::warn!(
                            lock_id = %lock.id(),
                            locked_object = %lock.locked_object(),
                            "Failed to release lock on drop: {}",
                            e
                        );
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    lock_id = %lock.id(),
                    locked_object = %lock.locked_object(),
                    "No async runtime to release dropped lock guard, lease left to expire"
                );
            }
        }
    }
}
