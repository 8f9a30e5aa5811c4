//! Lock manager: the acquire/renew/release/cleanup protocol
//!
//! The manager is stateless; every answer comes from the shared `LockStore`.
//! Cloning is cheap and clones share store, clock and naming function.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use leasehold_persistence::{InsertOutcome, LockRecord, LockStore};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{LockError, LockResult};
use crate::lock::Lock;
use crate::metrics;
use crate::naming::{LockTarget, Lockable, NamingFn, default_lock_name};
use crate::settings::LockSettings;

#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    naming: NamingFn,
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("storage_mode", &self.store.storage_mode())
            .field("clock", &self.clock)
            .finish()
    }
}

/// Expiry instant for a lease renewed at `renewed_on`
fn lease_end(
    renewed_on: DateTime<Utc>,
    max_age: Option<u64>,
) -> LockResult<Option<DateTime<Utc>>> {
    let Some(secs) = max_age else {
        return Ok(None);
    };
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|age| renewed_on.checked_add_signed(age))
        .map(Some)
        .ok_or(LockError::InvalidMaxAge(secs))
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            naming: Arc::new(default_lock_name),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the `"<type>:<id>"` naming convention for object targets
    pub fn with_naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&dyn Lockable) -> String + Send + Sync + 'static,
    {
        self.naming = Arc::new(naming);
        self
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolve the `locked_object` key for a target
    pub fn lock_name<'a>(&self, target: impl Into<LockTarget<'a>>) -> String {
        target.into().resolve(&self.naming)
    }

    /// Acquire a lease on `target`.
    ///
    /// `max_age` is the lease length in seconds; `None` means the lease never
    /// expires on its own and `Some(0)` yields a lease that is already
    /// expired. Fails with `AlreadyLocked` if a live lease exists. An expired
    /// lease on the same object is superseded.
    pub async fn acquire_lock<'a>(
        &self,
        target: impl Into<LockTarget<'a>>,
        max_age: Option<u64>,
    ) -> LockResult<Lock> {
        let locked_object = self.lock_name(target);
        let now = self.now();

        let record = LockRecord {
            id: Uuid::new_v4(),
            locked_object,
            created_on: now,
            renewed_on: now,
            expires_on: lease_end(now, max_age)?,
            max_age,
        };

        match self.store.insert_if_absent(&record, now).await? {
            InsertOutcome::Inserted => {
                tracing::debug!(
                    lock_id = %record.id,
                    locked_object = %record.locked_object,
                    max_age = ?max_age,
                    "Acquired lock"
                );
                metrics::record_acquired();
                Ok(Lock::new(self.clone(), record))
            }
            InsertOutcome::Conflict => {
                tracing::debug!(
                    locked_object = %record.locked_object,
                    "Failed to acquire lock, object is already locked"
                );
                metrics::record_acquire_conflict();
                Err(LockError::AlreadyLocked(record.locked_object))
            }
        }
    }

    /// Whether a live lease exists for `target`
    pub async fn is_locked<'a>(&self, target: impl Into<LockTarget<'a>>) -> LockResult<bool> {
        let locked_object = self.lock_name(target);
        let now = self.now();
        Ok(self
            .store
            .find_by_object(&locked_object)
            .await?
            .is_some_and(|record| record.is_live_at(now)))
    }

    /// Current row for `target`, live or expired
    pub async fn get_lock<'a>(
        &self,
        target: impl Into<LockTarget<'a>>,
    ) -> LockResult<Option<LockRecord>> {
        let locked_object = self.lock_name(target);
        Ok(self.store.find_by_object(&locked_object).await?)
    }

    /// Renew the lease with the given id.
    ///
    /// Fails with `NonexistentLock` if the row is gone and `Expired` if the
    /// lease has lapsed; a lapsed lease is never revived.
    pub async fn renew_lock(&self, id: Uuid) -> LockResult<Lock> {
        self.renew_held(id, None).await
    }

    /// Renewal on behalf of a handle that knows which object it locked, so a
    /// lease lost to another holder is reported as `RenewalError`.
    pub(crate) async fn renew_held(
        &self,
        id: Uuid,
        locked_object: Option<&str>,
    ) -> LockResult<Lock> {
        let now = self.now();

        let Some(current) = self.store.find_by_id(id).await? else {
            return Err(self.lost_lease(id, locked_object).await?);
        };

        if current.is_expired_at(now) {
            tracing::debug!(lock_id = %id, "Refusing to renew expired lock");
            return Err(LockError::Expired(id));
        }

        // renewed_on never moves behind created_on, even if the clock steps back
        let renewed_on = now.max(current.renewed_on);
        let renewed = LockRecord {
            renewed_on,
            expires_on: lease_end(renewed_on, current.max_age)?,
            ..current
        };

        // A reclamation or supersede between the read and this write shows
        // up as a missing row
        if !self.store.update_if_exists(&renewed).await? {
            return Err(self.lost_lease(id, locked_object).await?);
        }

        tracing::debug!(
            lock_id = %id,
            locked_object = %renewed.locked_object,
            expires_on = ?renewed.expires_on,
            "Renewed lock"
        );
        metrics::record_renewed();
        Ok(Lock::new(self.clone(), renewed))
    }

    async fn lost_lease(&self, id: Uuid, locked_object: Option<&str>) -> LockResult<LockError> {
        if let Some(locked_object) = locked_object
            && let Some(holder) = self.store.find_by_object(locked_object).await?
            && holder.id != id
        {
            tracing::debug!(
                lock_id = %id,
                holder = %holder.id,
                locked_object = %locked_object,
                "Lock was taken over by another holder"
            );
            return Ok(LockError::RenewalError {
                id,
                locked_object: locked_object.to_string(),
            });
        }
        Ok(LockError::NonexistentLock(id))
    }

    /// Release the lease with the given id, expired or not.
    ///
    /// With `silent`, releasing a lock that is not held is a no-op; otherwise
    /// it fails with `NotLocked`.
    pub async fn release_lock(&self, id: Uuid, silent: bool) -> LockResult<()> {
        if self.store.delete_by_id(id).await? {
            tracing::debug!(lock_id = %id, "Released lock");
            metrics::record_released();
            return Ok(());
        }

        if silent {
            Ok(())
        } else {
            Err(LockError::NotLocked(id))
        }
    }

    /// All rows whose lease has lapsed
    pub async fn get_expired_locks(&self) -> LockResult<Vec<LockRecord>> {
        Ok(self.store.find_expired(self.now()).await?)
    }

    /// Delete all expired rows.
    ///
    /// With a positive implicit max age in `settings`, rows acquired without a
    /// `max_age` are also deleted once they have gone that long without
    /// renewal. Returns the number of deleted rows. Safe to run concurrently
    /// with itself and with the rest of the protocol.
    pub async fn clean_expired_locks(&self, settings: &LockSettings) -> LockResult<u64> {
        let now = self.now();
        let cutoff = settings.implicit_cutoff(now)?;

        let deleted = self.store.delete_expired(now, cutoff).await?;
        if deleted > 0 {
            tracing::info!(
                deleted = deleted,
                implicit_max_age = ?settings.implicit_max_age(),
                "Reclaimed expired locks"
            );
            metrics::record_reclaimed(deleted);
        }
        Ok(deleted)
    }

    /// Acquire `target`, run `f` with the lock, and release it afterwards
    /// whichever way `f` finishes.
    pub async fn with_lock<'a, F, Fut, T>(
        &self,
        target: impl Into<LockTarget<'a>>,
        max_age: Option<u64>,
        f: F,
    ) -> LockResult<T>
    where
        F: FnOnce(Lock) -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.acquire_lock(target, max_age).await?;
        lock.scope(f).await
    }
}
