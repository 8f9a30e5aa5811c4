//! Leasehold Migration - schema for the lock table
//!
//! Run `Migrator::up(&db, None)` once per database before using
//! `ExternalDbLockStore`.

pub use sea_orm_migration::prelude::*;

mod m20171004_000001_create_non_blocking_lock;
mod m20171208_000002_index_lease_timestamps;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20171004_000001_create_non_blocking_lock::Migration),
            Box::new(m20171208_000002_index_lease_timestamps::Migration),
        ]
    }
}

/// Lock table identifiers shared by the migrations
#[derive(DeriveIden)]
pub(crate) enum NonBlockingLock {
    Table,
    Id,
    LockedObject,
    CreatedOn,
    RenewedOn,
    ExpiresOn,
    MaxAge,
}
