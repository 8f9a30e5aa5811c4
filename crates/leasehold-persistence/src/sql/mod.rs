//! SQL-based lock store (MySQL/PostgreSQL/SQLite via SeaORM)
//!
//! The table carries a unique key on `locked_object`. Acquisition runs as one
//! transaction: drop the row for the same object if it has lapsed, then
//! insert. Two callers racing on the same object both reach the insert and the
//! unique key lets exactly one of them through.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{prelude::Expr, *};
use uuid::Uuid;

use crate::entity::non_blocking_lock;
use crate::model::{InsertOutcome, LockRecord, StorageMode};
use crate::traits::LockStore;

/// Connection pool options for the lock database
#[derive(Clone, Debug)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub sqlx_logging: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            sqlx_logging: false,
        }
    }
}

/// Open a connection pool to the lock database
pub async fn connect(url: &str, pool: &PoolOptions) -> anyhow::Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(url.to_string());

    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .connect_timeout(pool.connect_timeout)
        .sqlx_logging(pool.sqlx_logging);

    tracing::info!(
        max_connections = pool.max_connections,
        min_connections = pool.min_connections,
        sqlx_logging = pool.sqlx_logging,
        "Lock database connection pool configured"
    );

    Ok(Database::connect(opt).await?)
}

/// External database lock store
///
/// Wraps a SeaORM `DatabaseConnection` whose schema was created by
/// `leasehold-migration`.
pub struct ExternalDbLockStore {
    db: DatabaseConnection,
}

impl ExternalDbLockStore {
    /// Create a new ExternalDbLockStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_record(model: non_blocking_lock::Model) -> anyhow::Result<LockRecord> {
    let max_age = model
        .max_age
        .map(u64::try_from)
        .transpose()
        .map_err(|_| anyhow::anyhow!("lock {} has a negative max_age", model.id))?;

    Ok(LockRecord {
        id: model.id,
        locked_object: model.locked_object,
        created_on: model.created_on,
        renewed_on: model.renewed_on,
        expires_on: model.expires_on,
        max_age,
    })
}

fn to_max_age_column(record: &LockRecord) -> anyhow::Result<Option<i64>> {
    record
        .max_age
        .map(i64::try_from)
        .transpose()
        .map_err(|_| anyhow::anyhow!("max_age of lock {} does not fit the column", record.id))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl LockStore for ExternalDbLockStore {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        non_blocking_lock::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        record: &LockRecord,
        now: DateTime<Utc>,
    ) -> anyhow::Result<InsertOutcome> {
        let active = non_blocking_lock::ActiveModel {
            id: Set(record.id),
            locked_object: Set(record.locked_object.clone()),
            created_on: Set(record.created_on),
            renewed_on: Set(record.renewed_on),
            expires_on: Set(record.expires_on),
            max_age: Set(to_max_age_column(record)?),
        };

        let tx = self.db.begin().await?;

        let superseded = non_blocking_lock::Entity::delete_many()
            .filter(non_blocking_lock::Column::LockedObject.eq(record.locked_object.as_str()))
            .filter(non_blocking_lock::Column::ExpiresOn.lte(now))
            .exec(&tx)
            .await?;
        if superseded.rows_affected > 0 {
            tracing::debug!(
                locked_object = %record.locked_object,
                "Superseding expired lock row"
            );
        }

        match non_blocking_lock::Entity::insert(active)
            .exec_without_returning(&tx)
            .await
        {
            Ok(_) => {
                tx.commit().await?;
                Ok(InsertOutcome::Inserted)
            }
            Err(err) if is_unique_violation(&err) => {
                tx.rollback().await?;
                Ok(InsertOutcome::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_object(&self, locked_object: &str) -> anyhow::Result<Option<LockRecord>> {
        non_blocking_lock::Entity::find()
            .filter(non_blocking_lock::Column::LockedObject.eq(locked_object))
            .one(&self.db)
            .await?
            .map(to_record)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<LockRecord>> {
        non_blocking_lock::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(to_record)
            .transpose()
    }

    async fn update_if_exists(&self, record: &LockRecord) -> anyhow::Result<bool> {
        let result = non_blocking_lock::Entity::update_many()
            .col_expr(
                non_blocking_lock::Column::RenewedOn,
                Expr::value(record.renewed_on),
            )
            .col_expr(
                non_blocking_lock::Column::ExpiresOn,
                Expr::value(record.expires_on),
            )
            .col_expr(
                non_blocking_lock::Column::MaxAge,
                Expr::value(to_max_age_column(record)?),
            )
            .filter(non_blocking_lock::Column::Id.eq(record.id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = non_blocking_lock::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<LockRecord>> {
        non_blocking_lock::Entity::find()
            .filter(non_blocking_lock::Column::ExpiresOn.lte(now))
            .order_by_asc(non_blocking_lock::Column::CreatedOn)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_record)
            .collect()
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        implicit_cutoff: Option<DateTime<Utc>>,
    ) -> anyhow::Result<u64> {
        let mut condition =
            Condition::any().add(non_blocking_lock::Column::ExpiresOn.lte(now));
        if let Some(cutoff) = implicit_cutoff {
            condition = condition.add(
                Condition::all()
                    .add(non_blocking_lock::Column::MaxAge.is_null())
                    .add(non_blocking_lock::Column::RenewedOn.lte(cutoff)),
            );
        }

        let result = non_blocking_lock::Entity::delete_many()
            .filter(condition)
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn find_all(&self) -> anyhow::Result<Vec<LockRecord>> {
        non_blocking_lock::Entity::find()
            .order_by_asc(non_blocking_lock::Column::CreatedOn)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leasehold_migration::{Migrator, MigratorTrait};

    async fn store() -> ExternalDbLockStore {
        let db = connect(
            "sqlite::memory:",
            &PoolOptions {
                max_connections: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Migrator::up(&db, None).await.unwrap();
        ExternalDbLockStore::new(db)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(name: &str, at: DateTime<Utc>, max_age: Option<u64>) -> LockRecord {
        LockRecord {
            id: Uuid::new_v4(),
            locked_object: name.to_string(),
            created_on: at,
            renewed_on: at,
            expires_on: max_age.map(|s| at + chrono::Duration::seconds(s as i64)),
            max_age,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = store().await;
        assert_eq!(store.storage_mode(), StorageMode::ExternalDb);
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_row_round_trips_through_table() {
        let store = store().await;
        let lock = record("User:7", t0(), Some(10));

        assert_eq!(
            store.insert_if_absent(&lock, t0()).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.find_by_id(lock.id).await.unwrap(), Some(lock.clone()));
        assert_eq!(store.find_by_object("User:7").await.unwrap(), Some(lock));
        assert!(store.find_by_object("User:8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_key_reports_conflict() {
        let store = store().await;
        let first = record("User:7", t0(), None);
        let second = record("User:7", t0(), None);

        store.insert_if_absent(&first, t0()).await.unwrap();
        assert_eq!(
            store.insert_if_absent(&second, t0()).await.unwrap(),
            InsertOutcome::Conflict
        );
        assert_eq!(store.find_all().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_expired_row_is_superseded() {
        let store = store().await;
        let stale = record("User:7", t0(), Some(1));
        store.insert_if_absent(&stale, t0()).await.unwrap();

        let later = t0() + chrono::Duration::hours(1);
        let fresh = record("User:7", later, Some(1));
        assert_eq!(
            store.insert_if_absent(&fresh, later).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.find_all().await.unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = store().await;
        let mut lock = record("User:7", t0(), Some(10));
        store.insert_if_absent(&lock, t0()).await.unwrap();

        lock.renewed_on = t0() + chrono::Duration::seconds(5);
        lock.expires_on = Some(t0() + chrono::Duration::seconds(15));
        assert!(store.update_if_exists(&lock).await.unwrap());
        assert_eq!(store.find_by_id(lock.id).await.unwrap(), Some(lock.clone()));

        assert!(store.delete_by_id(lock.id).await.unwrap());
        assert!(!store.delete_by_id(lock.id).await.unwrap());
        assert!(!store.update_if_exists(&lock).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let store = store().await;
        let short = record("short", t0(), Some(1));
        let unbounded = record("unbounded", t0(), None);
        let long = record("long", t0(), Some(7200));
        for lock in [&short, &unbounded, &long] {
            store.insert_if_absent(lock, t0()).await.unwrap();
        }

        let now = t0() + chrono::Duration::hours(1);
        assert_eq!(store.find_expired(now).await.unwrap(), vec![short]);
        assert_eq!(store.delete_expired(now, None).await.unwrap(), 1);
        assert_eq!(store.delete_expired(now, Some(now)).await.unwrap(), 1);
        assert_eq!(store.find_all().await.unwrap(), vec![long]);
    }
}
