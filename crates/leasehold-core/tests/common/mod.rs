//! Shared fixtures for lock protocol integration tests

#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{DateTime, TimeZone, Utc};
use leasehold_core::{LockManager, Lockable, ManualClock};
use leasehold_migration::{Migrator, MigratorTrait};
use leasehold_persistence::sql::connect;
use leasehold_persistence::{ExternalDbLockStore, LockStore, MemoryLockStore, PoolOptions};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A caller-side domain object locked by identity
pub struct User {
    pub id: u64,
}

impl Lockable for User {
    fn lock_type(&self) -> &str {
        "User"
    }

    fn lock_id(&self) -> String {
        self.id.to_string()
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0).unwrap()
}

pub async fn sqlite_store() -> Arc<dyn LockStore> {
    let db = connect(
        "sqlite::memory:",
        &PoolOptions {
            max_connections: 1,
            ..Default::default()
        },
    )
    .await
    .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrate lock table");
    Arc::new(ExternalDbLockStore::new(db))
}

/// File-backed SQLite behind a pool of several connections, so that
/// transactions from concurrent callers really interleave
pub async fn pooled_sqlite_store(dir: &TempDir) -> Arc<dyn LockStore> {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("locks.db").display());
    let db = connect(
        &url,
        &PoolOptions {
            max_connections: 8,
            ..Default::default()
        },
    )
    .await
    .expect("connect to file-backed sqlite");
    Migrator::up(&db, None).await.expect("migrate lock table");
    Arc::new(ExternalDbLockStore::new(db))
}

/// Every backend under test, labelled for assertion messages
pub async fn stores() -> Vec<(&'static str, Arc<dyn LockStore>)> {
    init_tracing();
    vec![
        ("memory", Arc::new(MemoryLockStore::new()) as Arc<dyn LockStore>),
        ("sqlite", sqlite_store().await),
    ]
}

/// A manager over every backend, each driven by its own frozen clock
pub async fn managers(start: DateTime<Utc>) -> Vec<(&'static str, LockManager, ManualClock)> {
    stores()
        .await
        .into_iter()
        .map(|(name, store)| {
            let clock = ManualClock::new(start);
            let manager = LockManager::new(store).with_clock(Arc::new(clock.clone()));
            (name, manager, clock)
        })
        .collect()
}

/// `managers` plus a multi-connection SQLite backend. The returned directory
/// holds the database file and must outlive the managers.
pub async fn contended_managers(
    start: DateTime<Utc>,
) -> (TempDir, Vec<(&'static str, LockManager, ManualClock)>) {
    let dir = tempfile::tempdir().expect("create database directory");
    let mut backends = managers(start).await;

    let clock = ManualClock::new(start);
    let manager =
        LockManager::new(pooled_sqlite_store(&dir).await).with_clock(Arc::new(clock.clone()));
    backends.push(("sqlite-pool", manager, clock));

    (dir, backends)
}
